//! Read-side queries over a fresh index.
//!
//! Every query goes through [`Board::fresh_index`], so results reflect
//! out-of-band edits made since the last write.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::index::{Index, IndexEntry};
use super::ops::read_record;
use super::Board;
use crate::Result;
use crate::config::BoardConfig;

/// Filters for [`Board::list_tasks`]; `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub column: Option<String>,
    pub priority: Option<String>,
    pub tag: Option<String>,
    pub assignee: Option<String>,
}

impl TaskFilter {
    /// Whether an index entry passes every filter.
    ///
    /// Assignee comparison ignores ASCII case.
    pub fn matches(&self, entry: &IndexEntry) -> bool {
        self.column.as_ref().is_none_or(|c| &entry.status == c)
            && self.priority.as_ref().is_none_or(|p| &entry.priority == p)
            && self.tag.as_ref().is_none_or(|t| entry.tags.contains(t))
            && self
                .assignee
                .as_ref()
                .is_none_or(|a| entry.assigned.eq_ignore_ascii_case(a))
    }
}

/// One task as listed from the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub id: String,
    pub title: String,
    pub column: String,
    pub priority: String,
    pub tags: Vec<String>,
    pub assigned: String,
    pub created: String,
    pub modified: DateTime<Utc>,
}

impl TaskSummary {
    fn from_entry(id: &str, entry: &IndexEntry) -> Self {
        Self {
            id: id.to_string(),
            title: entry.title.clone(),
            column: entry.status.clone(),
            priority: entry.priority.clone(),
            tags: entry.tags.clone(),
            assigned: entry.assigned.clone(),
            created: entry.created.clone(),
            modified: entry.modified,
        }
    }
}

/// One column of the board view.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub id: String,
    pub name: String,
    pub count: usize,
    pub tasks: Vec<TaskSummary>,
}

/// All columns with their tasks, in display order.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub board_name: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub columns: Vec<ColumnView>,
}

/// Full detail of one task, read from its file.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub summary: TaskSummary,
    pub column_name: String,
    pub path: PathBuf,
    pub description: String,
    pub notes: String,
    pub history: Vec<String>,
}

/// Entries passing `filter`, ordered by column, then priority rank, then id.
pub fn select(config: &BoardConfig, index: &Index, filter: &TaskFilter) -> Vec<TaskSummary> {
    let mut tasks: Vec<TaskSummary> = index
        .tasks
        .iter()
        .filter(|(_, entry)| filter.matches(entry))
        .map(|(id, entry)| TaskSummary::from_entry(id, entry))
        .collect();
    tasks.sort_by(|a, b| {
        config
            .column_rank(&a.column)
            .cmp(&config.column_rank(&b.column))
            .then(config.priority_rank(&a.priority).cmp(&config.priority_rank(&b.priority)))
            .then_with(|| a.id.cmp(&b.id))
    });
    tasks
}

impl Board {
    /// List tasks matching `filter`.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskSummary>> {
        let config = self.config()?;
        let index = self.fresh_index(&config)?;
        Ok(select(&config, &index, filter))
    }

    /// Every configured column with its tasks.
    pub fn board_view(&self) -> Result<BoardView> {
        let config = self.config()?;
        let index = self.fresh_index(&config)?;
        let tasks = select(&config, &index, &TaskFilter::default());

        let columns = config
            .columns
            .iter()
            .map(|column| {
                let tasks: Vec<TaskSummary> = tasks
                    .iter()
                    .filter(|t| t.column == column.id)
                    .cloned()
                    .collect();
                ColumnView {
                    id: column.id.clone(),
                    name: column.name.clone(),
                    count: index.count(&column.id),
                    tasks,
                }
            })
            .collect();

        Ok(BoardView {
            board_name: config.board_name.clone(),
            last_sync: index.last_sync,
            columns,
        })
    }

    /// Resolve a full or partial id and read the task's file.
    pub fn show_task(&self, id_or_prefix: &str) -> Result<TaskDetail> {
        let config = self.config()?;
        let index = self.fresh_index(&config)?;
        let id = index.resolve(id_or_prefix)?;
        let Some(entry) = index.get(&id) else {
            return Err(crate::Error::NotFound(format!("No task matches '{}'", id)));
        };

        let path = self.task_path(entry);
        let record = read_record(&path, &config)?;
        let sections = record.sections();
        Ok(TaskDetail {
            summary: TaskSummary::from_entry(&id, entry),
            column_name: config.column_name(&entry.status).to_string(),
            path,
            description: sections.description,
            notes: sections.notes,
            history: sections.history,
        })
    }

    /// Time of the last index save, after bringing the index up to date.
    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        let config = self.config()?;
        Ok(self.fresh_index(&config)?.last_sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewTask;
    use crate::test_utils::TestBoard;
    use std::fs;

    fn seed(board: &TestBoard) -> Vec<String> {
        let rows = [
            ("Low thing", "todo", "low", vec!["ui"], "alice"),
            ("Urgent thing", "todo", "critical", vec!["backend"], "bob"),
            ("Review me", "review", "high", vec!["ui", "backend"], "Alice"),
        ];
        rows
            .into_iter()
            .map(|(title, column, priority, tags, assignee)| {
                let mut new = NewTask::new(title);
                new.column = Some(column.to_string());
                new.priority = Some(priority.to_string());
                new.tags = tags.into_iter().map(String::from).collect();
                new.assignee = Some(assignee.to_string());
                board.board.create_task(&new).unwrap().id
            })
            .collect()
    }

    #[test]
    fn test_list_orders_by_column_then_priority() {
        let board = TestBoard::new();
        seed(&board);
        let titles: Vec<String> = board
            .board
            .list_tasks(&TaskFilter::default())
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Urgent thing", "Low thing", "Review me"]);
    }

    #[test]
    fn test_list_filters() {
        let board = TestBoard::new();
        seed(&board);

        let by_tag = TaskFilter {
            tag: Some("ui".to_string()),
            ..Default::default()
        };
        assert_eq!(board.board.list_tasks(&by_tag).unwrap().len(), 2);

        let by_assignee = TaskFilter {
            assignee: Some("alice".to_string()),
            column: Some("review".to_string()),
            ..Default::default()
        };
        let tasks = board.board.list_tasks(&by_assignee).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Review me");

        let by_priority = TaskFilter {
            priority: Some("low".to_string()),
            ..Default::default()
        };
        assert_eq!(board.board.list_tasks(&by_priority).unwrap()[0].title, "Low thing");
    }

    #[test]
    fn test_board_view_has_every_column() {
        let board = TestBoard::new();
        seed(&board);
        let view = board.board.board_view().unwrap();
        let ids: Vec<&str> = view.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "in-progress", "review", "done"]);
        assert_eq!(view.columns[0].count, 2);
        assert_eq!(view.columns[0].tasks.len(), 2);
        assert_eq!(view.columns[1].count, 0);
        assert_eq!(view.board_name, "Test Board");
    }

    #[test]
    fn test_show_reads_sections() {
        let board = TestBoard::new();
        let ids = seed(&board);
        board.board.move_task(&ids[0], "done").unwrap();

        let detail = board.board.show_task(&ids[0]).unwrap();
        assert_eq!(detail.summary.column, "done");
        assert_eq!(detail.column_name, "Done");
        assert_eq!(detail.history.len(), 1);
        assert!(detail.path.is_file());
    }

    #[test]
    fn test_show_sees_out_of_band_edits() {
        let board = TestBoard::new();
        let ids = seed(&board);
        let detail = board.board.show_task(&ids[1]).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(1100));
        let text = fs::read_to_string(&detail.path).unwrap();
        fs::write(&detail.path, text.replace("Urgent thing", "Renamed by hand")).unwrap();

        let detail = board.board.show_task(&ids[1]).unwrap();
        assert_eq!(detail.summary.title, "Renamed by hand");
    }

    #[test]
    fn test_show_unparsable_file_is_fatal() {
        let board = TestBoard::new();
        let ids = seed(&board);
        let detail = board.board.show_task(&ids[1]).unwrap();

        // Keep the mtime older than the index so the stale entry is served.
        let index_mtime = fs::metadata(board.root().join("index.json"))
            .unwrap()
            .modified()
            .unwrap();
        fs::write(&detail.path, "broken").unwrap();
        let file = fs::File::options().write(true).open(&detail.path).unwrap();
        file.set_modified(index_mtime - std::time::Duration::from_secs(60))
            .unwrap();

        assert!(matches!(
            board.board.show_task(&ids[1]),
            Err(crate::Error::Parse { .. })
        ));
    }
}
