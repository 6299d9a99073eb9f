//! Integration tests for objkeep
//!
//! These tests model a small company directory: companies own employees
//! and an address, employees own their address.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use objkeep::error::EngineResult;
use objkeep::{
    AnyRecord, CascadeDeletableInstances, CascadeDeletableTypes, Instance, KeyStore,
    MemoryKeyStore, Migration, Record, RecordType, StoreConfig, StoreError, StoreFactory,
    StoreHelper,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Address {
    id: i64,
    street: String,
    city: String,
}

impl Record for Address {
    const NAME: &'static str = "Address";
    const PRIMARY_KEY: Option<&'static str> = Some("id");
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Employee {
    id: i64,
    name: String,
    address: Option<Address>,
}

impl Record for Employee {
    const NAME: &'static str = "Employee";
    const PRIMARY_KEY: Option<&'static str> = Some("id");

    fn objects_for_cascade_delete(&self) -> Vec<Box<dyn AnyRecord>> {
        self.address
            .iter()
            .map(|address| Box::new(address.clone()) as Box<dyn AnyRecord>)
            .collect()
    }

    fn types_for_cascade_delete() -> Vec<RecordType> {
        vec![RecordType::of::<Address>()]
    }
}

impl CascadeDeletableInstances for Employee {}
impl CascadeDeletableTypes for Employee {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Company {
    id: i64,
    name: String,
    employees: Vec<Employee>,
    address: Option<Address>,
}

impl Record for Company {
    const NAME: &'static str = "Company";
    const PRIMARY_KEY: Option<&'static str> = Some("id");

    fn objects_for_cascade_delete(&self) -> Vec<Box<dyn AnyRecord>> {
        let mut children: Vec<Box<dyn AnyRecord>> = self
            .employees
            .iter()
            .map(|employee| Box::new(employee.clone()) as Box<dyn AnyRecord>)
            .collect();
        if let Some(address) = &self.address {
            children.push(Box::new(address.clone()));
        }
        children
    }

    fn types_for_cascade_delete() -> Vec<RecordType> {
        vec![RecordType::of::<Employee>()]
    }
}

impl CascadeDeletableInstances for Company {}
impl CascadeDeletableTypes for Company {}

/// Log line without a primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AuditEntry {
    sequence: i64,
    message: String,
}

impl Record for AuditEntry {
    const NAME: &'static str = "AuditEntry";
}

fn address(id: i64, city: &str) -> Address {
    Address { id, street: format!("{} Main Street", id), city: city.to_string() }
}

fn employee(id: i64, name: &str, address: Option<Address>) -> Employee {
    Employee { id, name: name.to_string(), address }
}

/// Company 1 with two employees, one of them with an address
fn acme() -> Company {
    Company {
        id: 1,
        name: "Acme".into(),
        employees: vec![
            employee(10, "Ada", Some(address(100, "London"))),
            employee(11, "Grace", None),
        ],
        address: Some(address(101, "Paris")),
    }
}

/// Save a company and everything it owns as separate records
fn save_company(store: &StoreHelper, company: &Company) {
    let mut employees = company.employees.clone();
    let mut addresses: Vec<Address> = employees.iter().filter_map(|e| e.address.clone()).collect();
    addresses.extend(company.address.clone());

    store.save(&mut company.clone(), None).unwrap();
    store.save_all(&mut employees, None).unwrap();
    store.save_all(&mut addresses, None).unwrap();
}

fn memory_store() -> StoreHelper {
    let factory = StoreFactory::new(StoreConfig::new(&std::env::temp_dir()));
    StoreHelper::in_memory(Arc::new(factory))
}

fn disk_factory(dir: &Path, key_store: &Arc<MemoryKeyStore>) -> Arc<StoreFactory> {
    let config = StoreConfig::new(dir).with_key_store(key_store.clone());
    Arc::new(StoreFactory::new(config))
}

fn ids<T: Record>(store: &StoreHelper, id: impl Fn(&T) -> i64) -> Vec<i64> {
    let mut ids: Vec<i64> = store.find_all::<T>().iter().map(id).collect();
    ids.sort();
    ids
}

#[test]
fn test_save_and_find_all() {
    let store = memory_store();
    let mut employees = vec![employee(1, "Ada", None), employee(2, "Grace", Some(address(7, "Rome")))];
    store.save_all(&mut employees, None).unwrap();

    assert_eq!(store.find_all::<Employee>(), employees);
    assert_eq!(store.count::<Employee>(), 2);
    assert_eq!(store.find_by_primary_key::<Employee>(2).unwrap().name, "Grace");
    assert_eq!(store.find::<Employee>(|e| e.address.is_some()).len(), 1);
    assert!(store.find_all::<Company>().is_empty());
}

#[test]
fn test_save_with_auto_increment() {
    let store = memory_store();

    let mut first = vec![
        AuditEntry { sequence: 0, message: "created".into() },
        AuditEntry { sequence: 0, message: "renamed".into() },
    ];
    store.save_all(&mut first, Some("sequence")).unwrap();
    assert_eq!(first[1].sequence, 2);

    let mut next = AuditEntry { sequence: 0, message: "closed".into() };
    store.save(&mut next, Some("sequence")).unwrap();
    assert_eq!(next.sequence, 3);

    let stored: Vec<i64> = store.find_all::<AuditEntry>().iter().map(|a| a.sequence).collect();
    assert_eq!(stored, vec![1, 2, 3]);
}

#[test]
fn test_cascading_delete_company() {
    let store = memory_store();
    save_company(&store, &acme());
    let mut outsider = employee(20, "Linus", Some(address(200, "Helsinki")));
    store.save(&mut outsider, None).unwrap();
    store.save(&mut outsider.address.clone().unwrap(), None).unwrap();

    store.cascading_delete(&acme()).unwrap();

    assert_eq!(store.count::<Company>(), 0);
    assert_eq!(ids::<Employee>(&store, |e| e.id), vec![20]);
    assert_eq!(ids::<Address>(&store, |a| a.id), vec![200]);
}

#[test]
fn test_cascading_delete_employee_only() {
    let store = memory_store();
    let company = acme();
    save_company(&store, &company);

    store.cascading_delete(&company.employees[0]).unwrap();

    assert_eq!(store.count::<Company>(), 1);
    assert_eq!(ids::<Employee>(&store, |e| e.id), vec![11]);
    assert_eq!(ids::<Address>(&store, |a| a.id), vec![101]);
}

#[test]
fn test_cascading_delete_all_companies() {
    let store = memory_store();
    save_company(&store, &acme());
    store.save(&mut employee(30, "Unhired", None), None).unwrap();
    store.save(&mut address(300, "Nowhere"), None).unwrap();
    store.save(&mut AuditEntry { sequence: 1, message: "kept".into() }, None).unwrap();

    store.cascading_delete_all::<Company>().unwrap();

    assert_eq!(store.count::<Company>(), 0);
    assert_eq!(store.count::<Employee>(), 0);
    assert_eq!(store.count::<Address>(), 0);
    assert_eq!(store.count::<AuditEntry>(), 1);
}

#[test]
fn test_failed_cascade_changes_nothing() {
    let store = memory_store();
    let company = acme();
    save_company(&store, &company);
    store.delete(&address(100, "London")).unwrap();

    let result = store.cascading_delete(&company);
    assert!(matches!(result, Err(StoreError::ObjectNotFound(_))));

    assert_eq!(store.count::<Company>(), 1);
    assert_eq!(store.count::<Employee>(), 2);
    assert_eq!(ids::<Address>(&store, |a| a.id), vec![101]);
}

#[test]
fn test_delete_all_and_clear_database() {
    let store = memory_store();
    save_company(&store, &acme());

    store.delete_all::<Employee>().unwrap();
    assert_eq!(store.count::<Employee>(), 0);
    assert_eq!(store.count::<Address>(), 2);

    store.clear_database().unwrap();
    assert_eq!(store.count::<Company>(), 0);
    assert_eq!(store.count::<Address>(), 0);
}

#[test]
fn test_unavailable_store() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    let store = StoreHelper::default_store(disk_factory(&blocker, &key_store));

    assert!(!store.is_available());
    assert!(store.find_all::<Employee>().is_empty());
    assert_eq!(store.count::<Employee>(), 0);
    assert!(matches!(
        store.save(&mut employee(1, "Ada", None), None),
        Err(StoreError::CannotAccessFile(_))
    ));
    assert!(matches!(
        store.delete(&employee(1, "Ada", None)),
        Err(StoreError::CannotDelete(_))
    ));
    assert!(matches!(store.clear_database(), Err(StoreError::CannotDelete(_))));
}

#[test]
fn test_invalid_store_name_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    let factory = disk_factory(temp_dir.path(), &key_store);

    for name in ["", "default", "../outside", "nested/name"] {
        let store = StoreHelper::new(Arc::clone(&factory), Instance::Custom(name.into()));
        assert!(!store.is_available(), "{:?}", name);
        assert!(matches!(
            store.save(&mut employee(1, "Ada", None), None),
            Err(StoreError::CannotAccessFile(_))
        ));
    }

    assert!(!temp_dir.path().join("default.store").exists());
    assert!(!temp_dir.path().parent().unwrap().join("outside.store").exists());
}

#[test]
fn test_reopen_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    {
        let store = StoreHelper::default_store(disk_factory(temp_dir.path(), &key_store));
        save_company(&store, &acme());
    }

    assert!(temp_dir.path().join("default.store").exists());

    let store = StoreHelper::default_store(disk_factory(temp_dir.path(), &key_store));
    assert_eq!(store.find_all::<Company>(), vec![acme()]);
    assert_eq!(store.count::<Address>(), 2);
}

/// Runs against the real platform keychain; skipped where the process has
/// no access to one
#[cfg(all(feature = "keyring", any(target_os = "linux", target_os = "macos", windows)))]
#[test]
fn test_reopen_with_keychain_keys() {
    use objkeep::KeyringKeyStore;

    let temp_dir = TempDir::new().unwrap();
    let service = format!("objkeep-tests-{}", uuid::Uuid::new_v4().simple());
    let key_store = Arc::new(KeyringKeyStore::new(&service));
    if let Err(e) = key_store.set("objkeep.availability", &[0]) {
        eprintln!("platform keychain unavailable, skipping: {}", e);
        return;
    }
    key_store.remove("objkeep.availability").unwrap();

    let factory = |key_store: Arc<KeyringKeyStore>| {
        let config = StoreConfig::new(temp_dir.path()).with_key_store(key_store);
        Arc::new(StoreFactory::new(config))
    };
    {
        let store = StoreHelper::default_store(factory(Arc::clone(&key_store)));
        store.save(&mut employee(1, "Ada", None), None).unwrap();
    }

    let reopened = StoreHelper::default_store(factory(Arc::new(KeyringKeyStore::new(&service))));
    assert!(reopened.is_available());
    assert_eq!(reopened.find_all::<Employee>(), vec![employee(1, "Ada", None)]);

    for name in ["objkeep.encrypt.key.default", "objkeep.encrypt.key.inmemory"] {
        key_store.remove(name).unwrap();
    }
}

#[test]
fn test_payloads_are_encrypted_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    {
        let store = StoreHelper::default_store(disk_factory(temp_dir.path(), &key_store));
        store.save(&mut employee(1, "Distinctive Name", None), None).unwrap();
    }

    let bytes = std::fs::read(temp_dir.path().join("default.store")).unwrap();
    let needle = b"Distinctive Name";
    assert!(!bytes.windows(needle.len()).any(|w| w == needle));
}

#[test]
fn test_wrong_key_makes_store_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    {
        let store = StoreHelper::default_store(disk_factory(temp_dir.path(), &key_store));
        store.save(&mut employee(1, "Ada", None), None).unwrap();
    }

    let store = StoreHelper::default_store(disk_factory(temp_dir.path(), &Arc::new(MemoryKeyStore::new())));

    assert!(!store.is_available());
    assert!(store.find_all::<Employee>().is_empty());
}

#[test]
fn test_named_stores_are_isolated() {
    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    let factory = disk_factory(temp_dir.path(), &key_store);
    let default = StoreHelper::default_store(Arc::clone(&factory));
    let cache = StoreHelper::new(Arc::clone(&factory), Instance::Custom("cache".into()));
    let memory = StoreHelper::in_memory(factory);

    default.save(&mut employee(1, "Ada", None), None).unwrap();
    cache.save(&mut employee(2, "Grace", None), None).unwrap();

    assert_eq!(ids::<Employee>(&default, |e| e.id), vec![1]);
    assert_eq!(ids::<Employee>(&cache, |e| e.id), vec![2]);
    assert_eq!(memory.count::<Employee>(), 0);
    assert!(temp_dir.path().join("cache.store").exists());
}

#[test]
fn test_migration_runs_once() {
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct LegacyEmployee {
        id: i64,
        full_name: String,
    }

    impl Record for LegacyEmployee {
        const NAME: &'static str = "Employee";
        const PRIMARY_KEY: Option<&'static str> = Some("id");
    }

    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    {
        let store = StoreHelper::default_store(disk_factory(temp_dir.path(), &key_store));
        store.save(&mut LegacyEmployee { id: 1, full_name: "Ada".into() }, None).unwrap();
    }

    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let migrator = move |migration: &mut Migration<'_>, _instance: &Instance, old: u64, new: u64| -> EngineResult<()> {
        recorded.lock().unwrap().push((old, new));
        let employees = RecordType::of::<Employee>();
        migration.rename_property(&employees, "full_name", "name")?;
        migration.enumerate_objects(&employees, |_, new| {
            new["address"] = serde_json::Value::Null;
            Ok(())
        })?;
        migration.create(&employees, &serde_json::json!({ "id": 2, "name": "Grace", "address": null }))?;
        Ok(())
    };
    let config = StoreConfig::new(temp_dir.path())
        .with_key_store(key_store)
        .with_schema_version(2)
        .with_migrator(Arc::new(migrator));
    let factory = Arc::new(StoreFactory::new(config));

    let store = StoreHelper::default_store(Arc::clone(&factory));
    assert_eq!(
        store.find_all::<Employee>(),
        vec![employee(1, "Ada", None), employee(2, "Grace", None)]
    );
    assert_eq!(store.store_properties().unwrap().schema_version, 2);

    let again = StoreHelper::default_store(factory);
    assert!(again.is_available());
    assert_eq!(again.count::<Employee>(), 2);
    assert_eq!(*calls.lock().unwrap(), vec![(1, 2)]);
}

#[test]
fn test_clone_handle_on_another_thread() {
    let store = memory_store();
    assert!(store.is_available());

    let handle = store.clone_handle();
    thread::spawn(move || {
        handle.save(&mut employee(5, "Worker", None), None).unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(store.find_all::<Employee>(), vec![employee(5, "Worker", None)]);
}

const WRITERS: usize = 4;
const SAVES_PER_WRITER: usize = 25;

/// Save from several cloned handles at once, each save auto-incrementing
fn save_concurrently(store: &StoreHelper) {
    assert!(store.is_available());

    let workers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let handle = store.clone_handle();
            thread::spawn(move || {
                for n in 0..SAVES_PER_WRITER {
                    let mut entry = AuditEntry { sequence: 0, message: format!("{}-{}", writer, n) };
                    handle.save(&mut entry, Some("sequence")).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let total = (WRITERS * SAVES_PER_WRITER) as i64;
    assert_eq!(store.count::<AuditEntry>(), total as usize);
    assert_eq!(ids::<AuditEntry>(store, |a| a.sequence), (1..=total).collect::<Vec<_>>());
}

#[test]
fn test_concurrent_writes_in_memory() {
    save_concurrently(&memory_store());
}

#[test]
fn test_concurrent_first_open_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    let store = StoreHelper::default_store(disk_factory(temp_dir.path(), &key_store));

    let workers: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let handle = store.clone_handle();
            thread::spawn(move || {
                handle.save(&mut employee(writer as i64, "Worker", None), None).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(ids::<Employee>(&store, |e| e.id), (0..WRITERS as i64).collect::<Vec<_>>());
}

#[test]
fn test_concurrent_writes_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let key_store = Arc::new(MemoryKeyStore::new());
    save_concurrently(&StoreHelper::default_store(disk_factory(temp_dir.path(), &key_store)));
}
