// Local file storage and the persistence boundary for principal role sets.
//
// ⚠️ VERSION BUMP REQUIRED:
// Changes to the on-disk role map require incrementing ROLE_STORE_VERSION.
use crate::context::AppContext;
use crate::model::{RoleSet, RoleTag};
use anyhow::Result;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

// Version history:
// - v1: principal id -> serialized role array (or null)
const ROLE_STORE_VERSION: u32 = 1;

pub struct LocalStorage;

impl LocalStorage {
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive advisory lock on `<file>.lock`.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}

/// Where serialized role sets are persisted.
///
/// Values are the encoded form produced by [`RoleSet::encode`]; `None` means
/// the principal has never had roles stored.
pub trait RoleStore {
    fn load(&self, principal: &str) -> Result<Option<String>>;
    fn store(&self, principal: &str, serialized: &str) -> Result<()>;
    fn delete(&self, principal: &str) -> Result<()>;
}

/// In-memory store. Counts writes so callers can observe write-through.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `store` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| anyhow::anyhow!("Role store mutex poisoned"))
    }
}

impl RoleStore for MemoryRoleStore {
    fn load(&self, principal: &str) -> Result<Option<String>> {
        Ok(self.values()?.get(principal).cloned())
    }

    fn store(&self, principal: &str, serialized: &str) -> Result<()> {
        self.values()?
            .insert(principal.to_string(), serialized.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, principal: &str) -> Result<()> {
        self.values()?.remove(principal);
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Default)]
struct RoleStoreData {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    principals: BTreeMap<String, Option<String>>,
}

/// JSON file store (`roles.json` in the data directory).
#[derive(Debug, Clone)]
pub struct LocalRoleStore {
    path: PathBuf,
}

impl LocalRoleStore {
    pub fn new(ctx: &dyn AppContext) -> Result<Self> {
        Ok(Self {
            path: ctx.get_roles_path()?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file without locking. Callers hold the lock.
    fn read_data(&self) -> Result<RoleStoreData> {
        if !self.path.exists() {
            return Ok(RoleStoreData {
                version: ROLE_STORE_VERSION,
                principals: BTreeMap::new(),
            });
        }
        let json = fs::read_to_string(&self.path)?;
        let data: RoleStoreData = serde_json::from_str(&json).map_err(|e| {
            anyhow::anyhow!("Failed to parse role store '{}': {}", self.path.display(), e)
        })?;
        if data.version != ROLE_STORE_VERSION {
            log::info!(
                "Role store {} is v{}, rewriting as v{} on next save",
                self.path.display(),
                data.version,
                ROLE_STORE_VERSION
            );
        }
        Ok(data)
    }

    fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, Option<String>>),
    {
        LocalStorage::with_lock(&self.path, || {
            let mut data = self.read_data()?;
            f(&mut data.principals);
            data.version = ROLE_STORE_VERSION;
            let json = serde_json::to_string_pretty(&data)?;
            LocalStorage::atomic_write(&self.path, json)?;
            Ok(())
        })
    }

    /// All principals with a stored entry.
    pub fn principals(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }
        LocalStorage::with_lock(&self.path, || {
            Ok(self.read_data()?.principals.into_keys().collect())
        })
    }
}

impl RoleStore for LocalRoleStore {
    fn load(&self, principal: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        LocalStorage::with_lock(&self.path, || {
            Ok(self.read_data()?.principals.remove(principal).flatten())
        })
    }

    fn store(&self, principal: &str, serialized: &str) -> Result<()> {
        self.modify(|principals| {
            principals.insert(principal.to_string(), Some(serialized.to_string()));
        })
    }

    fn delete(&self, principal: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.modify(|principals| {
            principals.remove(principal);
        })
    }
}

/// A principal's role set bound to a store.
///
/// Every effective change is written through immediately; no-ops never touch
/// the store. Serializing concurrent mutations of the same principal is the
/// caller's job (last write wins).
pub struct PrincipalRoles<'a, S: RoleStore + ?Sized> {
    principal: String,
    roles: RoleSet,
    store: &'a S,
}

impl<'a, S: RoleStore + ?Sized> PrincipalRoles<'a, S> {
    pub fn load(store: &'a S, principal: &str) -> Result<Self> {
        let raw = store.load(principal)?;
        let roles = RoleSet::decode(raw.as_deref())?;
        Ok(Self {
            principal: principal.to_string(),
            roles,
            store,
        })
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn has_role(&self, tag: RoleTag) -> bool {
        self.roles.has_role(tag)
    }

    pub fn has_any_role(&self, tags: &[RoleTag]) -> bool {
        self.roles.has_any_role(tags)
    }

    pub fn has_all_roles(&self, tags: &[RoleTag]) -> bool {
        self.roles.has_all_roles(tags)
    }

    pub fn labels(&self) -> String {
        self.roles.labels()
    }

    pub fn add_role(&mut self, tag: RoleTag) -> Result<bool> {
        self.apply(|roles| roles.add_role(tag))
    }

    pub fn remove_role(&mut self, tag: RoleTag) -> Result<bool> {
        self.apply(|roles| roles.remove_role(tag))
    }

    pub fn set_roles<I>(&mut self, tags: I) -> Result<bool>
    where
        I: IntoIterator<Item = RoleTag>,
    {
        self.apply(|roles| roles.set_roles(tags))
    }

    /// Removes the principal's entry from the store.
    pub fn destroy(self) -> Result<()> {
        self.store.delete(&self.principal)
    }

    // The in-memory set only changes once the write succeeded.
    fn apply<F>(&mut self, f: F) -> Result<bool>
    where
        F: FnOnce(&mut RoleSet) -> bool,
    {
        let mut next = self.roles.clone();
        if !f(&mut next) {
            log::debug!("Roles of {} unchanged, skipping write", self.principal);
            return Ok(false);
        }
        let encoded = next.encode();
        self.store.store(&self.principal, &encoded)?;
        log::debug!("Stored roles of {}: {}", self.principal, encoded);
        self.roles = next;
        Ok(true)
    }
}
