//! Sequential fail-fast task execution.

use tracing::{error, info};

use crate::task::{Task, TaskStatus};

/// Run tasks in order, stopping at the first failure.
///
/// Returns `true` iff every task completed. Tasks after the first failure
/// are never started and keep their `Pending` status; already-completed
/// tasks are not rolled back.
pub fn run_tasks(tasks: &mut [Task]) -> bool {
    for task in tasks.iter_mut() {
        info!("Running task '{}'...", task.kind());
        if task.run() == TaskStatus::Failed {
            error!("Task '{}' failed, aborting remaining tasks", task.kind());
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Action, TaskError};
    use std::path::PathBuf;

    #[derive(Debug)]
    struct Scripted {
        succeed: bool,
    }

    impl Action for Scripted {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        fn execute(&self) -> Result<(), TaskError> {
            if self.succeed {
                Ok(())
            } else {
                Err(TaskError::NotADirectory(PathBuf::from("/nope")))
            }
        }
    }

    fn tasks(script: &[bool]) -> Vec<Task> {
        script
            .iter()
            .map(|&succeed| Task::new(Box::new(Scripted { succeed })))
            .collect()
    }

    #[test]
    fn test_all_successes_complete_every_task() {
        let mut sequence = tasks(&[true, true, true]);
        assert!(run_tasks(&mut sequence));
        for task in &sequence {
            assert_eq!(task.status(), TaskStatus::Completed);
        }
    }

    #[test]
    fn test_empty_sequence_succeeds() {
        assert!(run_tasks(&mut []));
    }

    #[test]
    fn test_failure_stops_the_sequence() {
        let mut sequence = tasks(&[true, false, true, true]);
        assert!(!run_tasks(&mut sequence));

        assert_eq!(sequence[0].status(), TaskStatus::Completed);
        assert_eq!(sequence[1].status(), TaskStatus::Failed);
        // Tasks after the failure are never started.
        assert_eq!(sequence[2].status(), TaskStatus::Pending);
        assert_eq!(sequence[3].status(), TaskStatus::Pending);
    }

    #[test]
    fn test_failure_in_first_task_skips_all_others() {
        let mut sequence = tasks(&[false, true]);
        assert!(!run_tasks(&mut sequence));
        assert_eq!(sequence[0].status(), TaskStatus::Failed);
        assert_eq!(sequence[1].status(), TaskStatus::Pending);
    }
}
