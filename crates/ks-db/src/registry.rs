//! Named database registrations and their per-user connections.
//!
//! Each registration owns its connections, keyed by user name and created
//! lazily on first use. The first connection is opened through the
//! [`Connector`]; further users get sub-connections duplicated from it, so
//! every user of one registration addresses the same underlying database.
//! Closing the registry drops every connection, whatever the run outcome.

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use std::collections::HashMap;

/// Opens the first connection of a registration.
pub trait Connector {
    fn connect(&self, url: &str) -> DbResult<Box<dyn Database>>;
}

/// One registered database: name, url, and per-user connections.
pub struct DatabaseRegistration {
    name: String,
    url: String,
    default_user: String,
    current_user: String,
    connections: HashMap<String, Box<dyn Database>>,
}

impl DatabaseRegistration {
    fn new(name: &str, url: &str, default_user: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            default_user: default_user.to_string(),
            current_user: default_user.to_string(),
            connections: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn default_user(&self) -> &str {
        &self.default_user
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    /// Switch the acting user; the user's connection is created on first use.
    pub fn set_current_user(&mut self, user: &str) {
        self.current_user = user.to_string();
    }

    /// Reset the acting user to the registration default.
    pub fn reset_user(&mut self) {
        self.current_user = self.default_user.clone();
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> usize {
        self.connections.len()
    }

    fn connection_for(
        &mut self,
        connector: &dyn Connector,
        user: &str,
    ) -> DbResult<&mut dyn Database> {
        if !self.connections.contains_key(user) {
            let connection = match self.connections.values().next() {
                Some(existing) => existing.duplicate()?,
                None => connector.connect(&self.url)?,
            };
            log::debug!("opened connection to '{}' for user '{}'", self.name, user);
            self.connections.insert(user.to_string(), connection);
        }
        Ok(self
            .connections
            .get_mut(user)
            .expect("connection was just inserted")
            .as_mut())
    }

    fn close_all(&mut self) {
        if !self.connections.is_empty() {
            log::debug!(
                "closing {} connection(s) to '{}'",
                self.connections.len(),
                self.name
            );
        }
        self.connections.clear();
    }
}

/// All registered databases. The registration named `default` is the initial
/// current database and holds the version-tracking state.
pub struct DatabaseRegistry {
    connector: Box<dyn Connector>,
    databases: Vec<DatabaseRegistration>,
}

/// The registration name every registry must have.
pub const DEFAULT_DATABASE: &str = "default";

impl DatabaseRegistry {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            databases: Vec::new(),
        }
    }

    /// Register a database. Re-registering a name replaces the registration.
    pub fn register(&mut self, name: &str, url: &str, default_user: &str) {
        let registration = DatabaseRegistration::new(name, url, default_user);
        match self.position(name) {
            Some(i) => self.databases[i] = registration,
            None => self.databases.push(registration),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.databases
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// The stored name of a registration, looked up case-insensitively.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.databases[i].name())
    }

    pub fn get_mut(&mut self, name: &str) -> DbResult<&mut DatabaseRegistration> {
        let index = self
            .position(name)
            .ok_or_else(|| DbError::UnknownDatabase(name.to_string()))?;
        Ok(&mut self.databases[index])
    }

    /// The connection for a registration's current user, created lazily.
    pub fn connection(&mut self, name: &str) -> DbResult<&mut dyn Database> {
        let index = self
            .position(name)
            .ok_or_else(|| DbError::UnknownDatabase(name.to_string()))?;
        let registration = &mut self.databases[index];
        let user = registration.current_user.clone();
        registration.connection_for(self.connector.as_ref(), &user)
    }

    /// The default registration's connection for its *default* user — the
    /// connection the version-tracking state is read and written through,
    /// independent of SET USER.
    pub fn default_connection(&mut self) -> DbResult<&mut dyn Database> {
        let index = self
            .position(DEFAULT_DATABASE)
            .ok_or_else(|| DbError::UnknownDatabase(DEFAULT_DATABASE.to_string()))?;
        let registration = &mut self.databases[index];
        let user = registration.default_user.clone();
        registration.connection_for(self.connector.as_ref(), &user)
    }

    /// Reset every registration's acting user to its default.
    pub fn reset_users(&mut self) {
        for registration in &mut self.databases {
            registration.reset_user();
        }
    }

    /// Close every open connection on every registration.
    pub fn close_all(&mut self) {
        for registration in &mut self.databases {
            registration.close_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{RowSet, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeDb {
        opened: Rc<RefCell<Vec<usize>>>,
    }

    impl Database for FakeDb {
        fn execute_with(&mut self, _sql: &str, _params: &[Value]) -> DbResult<u64> {
            Ok(0)
        }
        fn relation_exists(&mut self, _name: &str) -> DbResult<bool> {
            Ok(false)
        }
        fn query_rows(&mut self, _sql: &str) -> DbResult<RowSet> {
            Ok(RowSet::default())
        }
        fn duplicate(&self) -> DbResult<Box<dyn Database>> {
            let id = self.opened.borrow().len();
            self.opened.borrow_mut().push(id);
            Ok(Box::new(FakeDb {
                opened: Rc::clone(&self.opened),
            }))
        }
        fn backend(&self) -> &'static str {
            "fake"
        }
    }

    struct FakeConnector {
        opened: Rc<RefCell<Vec<usize>>>,
    }

    impl Connector for FakeConnector {
        fn connect(&self, _url: &str) -> DbResult<Box<dyn Database>> {
            let id = self.opened.borrow().len();
            self.opened.borrow_mut().push(id);
            Ok(Box::new(FakeDb {
                opened: Rc::clone(&self.opened),
            }))
        }
    }

    fn registry() -> (Rc<RefCell<Vec<usize>>>, DatabaseRegistry) {
        let opened = Rc::new(RefCell::new(Vec::new()));
        let registry = DatabaseRegistry::new(Box::new(FakeConnector {
            opened: Rc::clone(&opened),
        }));
        (opened, registry)
    }

    #[test]
    fn test_connections_are_lazy() {
        let (opened, mut registry) = registry();
        registry.register("default", ":memory:", "admin");
        assert!(opened.borrow().is_empty());

        registry.connection("default").unwrap();
        assert_eq!(opened.borrow().len(), 1);

        // Same user reuses the connection.
        registry.connection("default").unwrap();
        assert_eq!(opened.borrow().len(), 1);
    }

    #[test]
    fn test_per_user_connections() {
        let (opened, mut registry) = registry();
        registry.register("default", ":memory:", "admin");

        registry.connection("default").unwrap();
        registry.get_mut("default").unwrap().set_current_user("batch");
        registry.connection("default").unwrap();

        assert_eq!(opened.borrow().len(), 2);
        assert_eq!(
            registry.get_mut("default").unwrap().open_connections(),
            2
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let (_, mut registry) = registry();
        registry.register("Audit", ":memory:", "admin");

        assert_eq!(registry.canonical_name("AUDIT"), Some("Audit"));
        assert!(registry.connection("audit").is_ok());

        let err = registry.connection("missing").unwrap_err();
        assert!(matches!(err, DbError::UnknownDatabase(_)));
    }

    #[test]
    fn test_default_connection_ignores_current_user() {
        let (opened, mut registry) = registry();
        registry.register("default", ":memory:", "admin");

        registry.get_mut("default").unwrap().set_current_user("batch");
        registry.default_connection().unwrap();
        registry.connection("default").unwrap();

        // One connection for "admin" (default user), one for "batch".
        assert_eq!(opened.borrow().len(), 2);
    }

    #[test]
    fn test_close_all_drops_connections() {
        let (_, mut registry) = registry();
        registry.register("default", ":memory:", "admin");
        registry.connection("default").unwrap();

        registry.close_all();
        assert_eq!(registry.get_mut("default").unwrap().open_connections(), 0);
    }

    #[test]
    fn test_reset_users() {
        let (_, mut registry) = registry();
        registry.register("default", ":memory:", "admin");
        registry.get_mut("default").unwrap().set_current_user("batch");

        registry.reset_users();
        assert_eq!(registry.get_mut("default").unwrap().current_user(), "admin");
    }
}
