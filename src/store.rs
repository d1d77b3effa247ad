use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::{error::Result, profile::UserPreferenceProfile};

/// Child id → JSON-encoded [`UserPreferenceProfile`].
const PROFILES: TableDefinition<&str, &str> = TableDefinition::new("profiles");
const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");

/// Settings key holding the search history as a JSON list.
pub const SEARCH_HISTORY_KEY: &str = "search_history";
/// Settings key holding the comma-separated popular activity ids.
pub const POPULAR_IDS_KEY: &str = "popular_ids";

/// Durable state that outlives a single engine instance: learner profiles,
/// search history and a few settings.
pub struct EngineStore {
    db: Database,
}

impl EngineStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(PROFILES)?;
        txn.open_table(SETTINGS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Profiles --

    pub fn save_profile(&self, profile: &UserPreferenceProfile) -> Result<()> {
        let json = serde_json::to_string(profile)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROFILES)?;
            table.insert(profile.child_id.as_str(), json.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Write several profiles in a single transaction.
    pub fn save_profiles(
        &self,
        profiles: &[UserPreferenceProfile],
    ) -> Result<()> {
        if profiles.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PROFILES)?;
            for profile in profiles {
                let json = serde_json::to_string(profile)?;
                table.insert(profile.child_id.as_str(), json.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub fn load_profile(
        &self,
        child_id: &str,
    ) -> Result<Option<UserPreferenceProfile>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROFILES)?;
        match table.get(child_id)? {
            Some(v) => Ok(Some(serde_json::from_str(v.value())?)),
            None => Ok(None),
        }
    }

    /// Every stored profile. Records that no longer decode are skipped
    /// with a warning.
    pub fn load_profiles(&self) -> Result<Vec<UserPreferenceProfile>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROFILES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            match serde_json::from_str(v.value()) {
                Ok(profile) => result.push(profile),
                Err(e) => tracing::warn!(
                    child = k.value(),
                    error = %e,
                    "skipping unreadable profile"
                ),
            }
        }
        Ok(result)
    }

    pub fn list_profile_ids(&self) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROFILES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, _v) = entry?;
            result.push(k.value().to_string());
        }
        Ok(result)
    }

    // -- Search history --

    /// Most-recent-first list of stored queries.
    pub fn load_history(&self) -> Result<Vec<String>> {
        match self.get_setting(SEARCH_HISTORY_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_history(&self, queries: &[String]) -> Result<()> {
        self.set_setting(SEARCH_HISTORY_KEY, &serde_json::to_string(queries)?)
    }

    // -- Popular ids --

    pub fn load_popular_ids(&self) -> Result<Option<Vec<String>>> {
        Ok(self.get_setting(POPULAR_IDS_KEY)?.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect()
        }))
    }

    pub fn save_popular_ids(&self, ids: &[String]) -> Result<()> {
        self.set_setting(POPULAR_IDS_KEY, &ids.join(","))
    }

    // -- Settings --

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SETTINGS)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }
}

impl std::fmt::Debug for EngineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineStore").finish_non_exhaustive()
    }
}
