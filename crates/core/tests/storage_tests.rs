// ═══════════════════════════════════════════════════════════════════
// Storage Tests: durable logo cache (JSON file and in-memory)
// ═══════════════════════════════════════════════════════════════════

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use chain_portfolio_core::errors::CoreError;
use chain_portfolio_core::models::cache::CacheEntry;
use chain_portfolio_core::storage::logo_store::{
    JsonFileLogoStore, LogoEntries, LogoStore, MemoryLogoStore,
};

fn sample_entries() -> LogoEntries {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
    let mut entries = LogoEntries::new();
    entries.insert(
        "token_logo:1:0xabc".to_string(),
        CacheEntry::new("https://img/abc.png".to_string(), at),
    );
    entries.insert(
        "token_logo:137:0xdef".to_string(),
        CacheEntry::new("https://img/def.png".to_string(), at),
    );
    entries
}

// ═══════════════════════════════════════════════════════════════════
// JsonFileLogoStore
// ═══════════════════════════════════════════════════════════════════

mod json_file {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLogoStore::new(dir.path().join("logos.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLogoStore::new(dir.path().join("logos.json"));
        let entries = sample_entries();

        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn file_layout_is_url_and_millis() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLogoStore::new(dir.path().join("logos.json"));
        store.save(&sample_entries()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entry = &json["token_logo:1:0xabc"];
        assert_eq!(entry["url"], "https://img/abc.png");
        assert_eq!(entry["timestamp"], 1_740_817_800_000_i64);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache").join("logos.json");
        let store = JsonFileLogoStore::new(&path);

        store.save(&sample_entries()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn clear_removes_file_and_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLogoStore::new(dir.path().join("logos.json"));

        store.clear().unwrap();
        store.save(&sample_entries()).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_deserialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logos.json");
        std::fs::write(&path, "{ definitely not json").unwrap();

        let err = JsonFileLogoStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CoreError::Deserialization(msg) if msg.contains("Corrupt logo cache")));
    }
}

// ═══════════════════════════════════════════════════════════════════
// MemoryLogoStore
// ═══════════════════════════════════════════════════════════════════

mod memory {
    use super::*;

    #[test]
    fn starts_empty() {
        assert!(MemoryLogoStore::new().load().unwrap().is_empty());
    }

    #[test]
    fn save_replaces_contents() {
        let store = MemoryLogoStore::with_entries(sample_entries());
        assert_eq!(store.load().unwrap().len(), 2);

        store.save(&LogoEntries::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn clear() {
        let store = MemoryLogoStore::with_entries(sample_entries());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_empty());
    }
}
