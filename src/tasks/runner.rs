use futures::stream::{self, StreamExt};
use tracing::info;

use super::{AwsTask, TaskReport};

/// Runs tasks for many accounts with a bounded number in flight
#[derive(Debug, Clone, Copy)]
pub struct TaskRunner {
    workers: usize,
}

impl TaskRunner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Reports come back in the order the tasks were given
    pub async fn run<T: AwsTask>(&self, tasks: Vec<(T, T::Client)>) -> Vec<TaskReport> {
        info!(tasks = tasks.len(), workers = self.workers, "Running tasks");

        let reports: Vec<TaskReport> = stream::iter(tasks)
            .map(|(task, client)| async move { task.run(&client).await })
            .buffered(self.workers)
            .collect()
            .await;

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        info!(reports = reports.len(), failed, "Tasks complete");
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{AccountState, AwsClients, InMemoryAccount};
    use crate::tasks::AuditS3BucketsTask;
    use crate::types::{Account, Bucket};
    use std::sync::Arc;

    fn clients_with_bucket(name: &str) -> Arc<InMemoryAccount> {
        let mut state = AccountState::default();
        state.buckets.push(Bucket::new(name));
        Arc::new(InMemoryAccount::new(state))
    }

    #[tokio::test]
    async fn test_reports_in_input_order_and_failures_isolated() {
        let broken = clients_with_bucket("b");
        broken.fail_operation("list_buckets");

        let tasks = vec![
            (
                AuditS3BucketsTask::new(Account::new("1", "first")),
                AwsClients::from_backend(clients_with_bucket("a")),
            ),
            (
                AuditS3BucketsTask::new(Account::new("2", "second")),
                AwsClients::from_backend(broken),
            ),
            (
                AuditS3BucketsTask::new(Account::new("3", "third")),
                AwsClients::from_backend(clients_with_bucket("c")),
            ),
        ];

        let reports = TaskRunner::new(2).run(tasks).await;
        let names: Vec<&str> = reports.iter().map(|r| r.account.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);

        assert!(reports[0].is_success());
        assert!(!reports[1].is_success());
        assert_eq!(reports[2].results["buckets"][0]["name"], "c");
    }
}
