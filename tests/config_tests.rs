//! Integration tests for tiered configuration feeding the repository.

use chrono::{DateTime, TimeZone, Utc};
use taskpoet::calendar::Calendar;
use taskpoet::config::{Config, ConfigLoader, ConfigPaths};
use taskpoet::db::Database;
use taskpoet::types::Task;

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 15, 4, 5).unwrap()
}

mod config_tests {
    use super::*;

    #[test]
    fn tiers_feed_the_repository() {
        let temp = tempfile::tempdir().unwrap();
        let user = temp.path().join("user.yaml");
        let project = temp.path().join("project.yaml");
        std::fs::write(&user, "defaults:\n  due: eow\nnamespace: personal\n").unwrap();
        std::fs::write(
            &project,
            "namespace: work\nrecurring:\n  - description: water plants\n    frequency: 1w\n",
        )
        .unwrap();

        let db_path = temp.path().join("poet.db");
        let db_env = db_path.to_string_lossy().to_string();
        let loader = ConfigLoader::load_with_env(
            ConfigPaths::with_files(Some(user), Some(project)),
            None,
            |key| (key == "TASKPOET_DB_PATH").then(|| db_env.clone()),
        )
        .unwrap();
        let config: Config = loader.into_config();
        assert_eq!(config.namespace, "work");
        assert_eq!(config.db_path, db_path);

        let db = Database::open(&config.db_path, &config.namespace).unwrap();
        let created = db.check_recurring(&config.recurring).unwrap();
        assert_eq!(created.len(), 1);

        // 2024-06-04 is a Tuesday; eow is the end of Saturday
        let cal = Calendar::with_present(at(2024, 6, 4));
        let defaults = config.default_task(&cal).unwrap().unwrap();
        let task = db.add(Task::new("with default due"), Some(&defaults)).unwrap();
        assert_eq!(
            task.due.map(|d| d.date_naive()),
            Some(Utc.with_ymd_and_hms(2024, 6, 8, 0, 0, 0).unwrap().date_naive())
        );
        assert_eq!(db.list("/active").unwrap().len(), 2);
    }
}
