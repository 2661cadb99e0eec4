//! The hybrid ordered/keyed container.
//!
//! [`OrderedContainer`] stores its values in one `Vec` of slots, in insertion
//! order, and keeps a `HashMap` from string key to slot position for the
//! slots that carry a key. Every slot is reachable by position; keyed slots
//! are reachable by key as well.
//!
//! # Invariants
//!
//! - Every mapped position is `< len()`, and each position carries at most
//!   one key.
//! - Removing the slot at `p` moves every key mapped above `p` down by one.
//! - Setting position `len()` appends; any larger position is an error.
//! - Stored keys are never empty, never decimal-only, and never contain `/`,
//!   so normalization always routes a stored key back to its slot.

use std::collections::HashMap;
use std::fmt;

use hdc_types::{is_decimal, normalize, split_head, Builtin, Key, Leaf};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{ContainerError, ContainerResult};
use crate::lock::{LockMode, Mutation};
use crate::registry::RealizerRegistry;
use crate::schema::Schema;
use crate::value::Value;

#[derive(Clone, Debug, PartialEq)]
struct Slot {
    key: Option<String>,
    value: Value,
}

/// Ordered sequence of values with optional, unique string keys.
///
/// ```
/// use hdc_container::OrderedContainer;
/// use hdc_types::{Builtin, Leaf};
///
/// let mut c = OrderedContainer::from_builtin(Builtin::map([
///     ("foo", Builtin::map([("bar", Builtin::seq([4i64, 2]))])),
/// ]))
/// .unwrap();
/// assert_eq!(c.get("foo/bar/0").unwrap(), &Leaf::Int(4));
///
/// c.set("tail", 23i64).unwrap();
/// assert_eq!(c.get(1usize).unwrap(), &Leaf::Int(23));
/// ```
#[derive(Clone, Debug)]
pub struct OrderedContainer {
    slots: Vec<Slot>,
    index_of_key: HashMap<String, usize>,
    read_only: bool,
    lock_mode: LockMode,
    schema: Schema,
    table_name: Option<String>,
}

fn validate_key(key: &str) -> ContainerResult<()> {
    if key.is_empty() {
        return Err(ContainerError::InvalidKeyType("empty key".into()));
    }
    if is_decimal(key) {
        return Err(ContainerError::InvalidKeyType(format!(
            "{key:?} would be read as a position"
        )));
    }
    if key.contains('/') {
        return Err(ContainerError::InvalidKeyType(format!(
            "{key:?} would be read as a path"
        )));
    }
    Ok(())
}

impl OrderedContainer {
    /// Create an empty, writable container.
    pub fn new() -> Self {
        Self::with_schema(Schema::default())
    }

    /// Create an empty container carrying the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            slots: Vec::new(),
            index_of_key: HashMap::new(),
            read_only: false,
            lock_mode: LockMode::default(),
            schema,
            table_name: None,
        }
    }

    /// Build a container from plain data, wrapping nested sequences and
    /// mappings recursively.
    pub fn from_builtin(data: Builtin) -> ContainerResult<Self> {
        let mut c = Self::new();
        c.update(data, true)?;
        Ok(c)
    }

    /// Builder: set the lock mode.
    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }

    /// Builder: set the default group name.
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// An empty container of the same kind, used for auto-created groups.
    fn empty_like(&self) -> Self {
        Self::with_schema(self.schema.clone()).with_lock_mode(self.lock_mode)
    }

    // ---------------------------------------------------------------
    // Metadata
    // ---------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `true` if any slot carries a key.
    pub fn has_keys(&self) -> bool {
        !self.index_of_key.is_empty()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn set_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    pub fn set_lock_mode(&mut self, mode: LockMode) {
        self.lock_mode = mode;
    }

    // ---------------------------------------------------------------
    // Locking
    // ---------------------------------------------------------------

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Lock this container and every nested container.
    pub fn lock(&mut self) {
        self.set_lock_recursive(true);
    }

    /// Unlock this container and every nested container.
    ///
    /// Unlocking a locked container is logged as a warning: once locked, a
    /// container is not expected to be written again.
    pub fn unlock(&mut self) {
        if self.read_only {
            warn!(container = %self.schema.name, "unlocking previously locked container");
        }
        self.set_lock_recursive(false);
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        if read_only {
            self.lock();
        } else {
            self.unlock();
        }
    }

    /// Run `f` with the container temporarily unlocked, restoring the
    /// previous lock state afterwards.
    pub fn unlocked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_locked = self.read_only;
        if was_locked {
            debug!(container = %self.schema.name, "temporarily unlocking container");
            self.set_lock_recursive(false);
        }
        let result = f(self);
        if was_locked {
            self.set_lock_recursive(true);
        }
        result
    }

    fn set_lock_recursive(&mut self, read_only: bool) {
        self.read_only = read_only;
        for slot in &mut self.slots {
            if let Value::Nested(c) = &mut slot.value {
                c.set_lock_recursive(read_only);
            }
        }
    }

    /// Set only this container's flag, leaving nested containers alone.
    pub(crate) fn set_read_only_flag(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Returns `Some(outcome)` if the mutation must not proceed.
    fn refuse_if_locked(&self, operation: &'static str) -> ContainerResult<Option<Mutation>> {
        if !self.read_only {
            return Ok(None);
        }
        match self.lock_mode {
            LockMode::Warn => {
                warn!(
                    operation,
                    container = %self.schema.name,
                    "mutation on read-only container suppressed"
                );
                Ok(Some(Mutation::Suppressed))
            }
            LockMode::Error => Err(ContainerError::ReadOnlyViolation { operation }),
        }
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    fn position_of(&self, key: &Key) -> ContainerResult<usize> {
        match key {
            Key::Index(i) if *i < self.slots.len() => Ok(*i),
            Key::Index(i) => Err(ContainerError::IndexOutOfRange {
                index: *i,
                len: self.slots.len(),
            }),
            Key::Name(name) => self
                .index_of_key
                .get(name)
                .copied()
                .ok_or_else(|| ContainerError::KeyNotFound(name.clone())),
            Key::Path(_) => Err(ContainerError::InvalidKeyType(format!(
                "path {key} does not name a single slot"
            ))),
        }
    }

    fn contains_normalized(&self, key: &Key) -> bool {
        match key {
            Key::Index(i) => *i < self.slots.len(),
            Key::Name(name) => self.index_of_key.contains_key(name),
            Key::Path(_) => false,
        }
    }

    /// Look up a value by position, key, or path.
    ///
    /// Lazily loaded values are returned as [`Value::Lazy`]; use
    /// [`fetch`](Self::fetch) to load them.
    pub fn get(&self, key: impl Into<Key>) -> ContainerResult<&Value> {
        match normalize(key.into()) {
            Key::Path(parts) => self.get_parts(&parts),
            key => {
                let pos = self.position_of(&key)?;
                Ok(&self.slots[pos].value)
            }
        }
    }

    fn get_parts(&self, parts: &[Key]) -> ContainerResult<&Value> {
        let (head, tail) = split_head(parts)?;
        let value = self.get(head.clone())?;
        if tail.is_empty() {
            return Ok(value);
        }
        value.container_at(&head)?.get_parts(tail)
    }

    /// Mutable lookup by position, key, or path.
    ///
    /// Mutation through the returned reference bypasses the read-only check.
    pub fn get_mut(&mut self, key: impl Into<Key>) -> ContainerResult<&mut Value> {
        match normalize(key.into()) {
            Key::Path(parts) => self.get_parts_mut(&parts),
            key => {
                let pos = self.position_of(&key)?;
                Ok(&mut self.slots[pos].value)
            }
        }
    }

    fn get_parts_mut(&mut self, parts: &[Key]) -> ContainerResult<&mut Value> {
        let (head, tail) = split_head(parts)?;
        let value = self.get_mut(head.clone())?;
        if tail.is_empty() {
            return Ok(value);
        }
        value.container_at_mut(&head)?.get_parts_mut(tail)
    }

    /// Look up a value, returning `default` when the key does not resolve.
    pub fn get_or<'a>(&'a self, key: impl Into<Key>, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if `key` resolves to a value.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.get(key).is_ok()
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Set a value by position, key, or path.
    ///
    /// - Position `len()` appends; positions in range overwrite.
    /// - A new key appends a keyed slot; an existing key overwrites in place.
    /// - A path creates missing intermediate containers.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> ContainerResult<Mutation> {
        if let Some(outcome) = self.refuse_if_locked("set")? {
            return Ok(outcome);
        }
        self.set_normalized(normalize(key.into()), value.into())
    }

    fn set_normalized(&mut self, key: Key, value: Value) -> ContainerResult<Mutation> {
        match key {
            Key::Index(i) => {
                let len = self.slots.len();
                if i < len {
                    self.slots[i].value = value;
                } else if i == len {
                    self.push_slot(None, value);
                } else {
                    return Err(ContainerError::IndexOutOfRange { index: i, len });
                }
                Ok(Mutation::Applied)
            }
            Key::Name(name) => {
                match self.index_of_key.get(&name) {
                    Some(&pos) => self.slots[pos].value = value,
                    None => {
                        validate_key(&name)?;
                        self.push_slot(Some(name), value);
                    }
                }
                Ok(Mutation::Applied)
            }
            Key::Path(parts) => {
                let (head, tail) = split_head(&parts)?;
                if tail.is_empty() {
                    return self.set_normalized(head, value);
                }
                if !self.contains_normalized(&head) && !matches!(head, Key::Path(_)) {
                    let group = Value::Nested(self.empty_like());
                    self.set_normalized(head.clone(), group)?;
                }
                let child = self.get_mut(head.clone())?.container_at_mut(&head)?;
                child.set(Key::Path(tail.to_vec()), value)
            }
        }
    }

    fn push_slot(&mut self, key: Option<String>, value: Value) {
        if let Some(k) = &key {
            self.index_of_key.insert(k.clone(), self.slots.len());
        }
        self.slots.push(Slot { key, value });
    }

    /// Append an unkeyed value.
    pub fn append(&mut self, value: impl Into<Value>) -> ContainerResult<Mutation> {
        if let Some(outcome) = self.refuse_if_locked("append")? {
            return Ok(outcome);
        }
        self.push_slot(None, value.into());
        Ok(Mutation::Applied)
    }

    /// Append unkeyed values.
    pub fn extend<V, I>(&mut self, values: I) -> ContainerResult<Mutation>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        if let Some(outcome) = self.refuse_if_locked("extend")? {
            return Ok(outcome);
        }
        for v in values {
            self.push_slot(None, v.into());
        }
        Ok(Mutation::Applied)
    }

    /// Insert a value at `position`, shifting later slots up by one.
    ///
    /// A position past the end appends. If `key` is given it is attached to
    /// the new slot, detaching it from any slot that carried it before.
    pub fn insert(
        &mut self,
        position: usize,
        value: impl Into<Value>,
        key: Option<&str>,
    ) -> ContainerResult<Mutation> {
        if let Some(outcome) = self.refuse_if_locked("insert")? {
            return Ok(outcome);
        }
        if let Some(k) = key {
            validate_key(k)?;
            if let Some(old) = self.index_of_key.remove(k) {
                self.slots[old].key = None;
            }
        }
        let position = position.min(self.slots.len());
        for pos in self.index_of_key.values_mut() {
            if *pos >= position {
                *pos += 1;
            }
        }
        let key = key.map(str::to_string);
        if let Some(k) = &key {
            self.index_of_key.insert(k.clone(), position);
        }
        self.slots.insert(
            position,
            Slot {
                key,
                value: value.into(),
            },
        );
        Ok(Mutation::Applied)
    }

    /// Attach `key` to the existing slot at `position`.
    ///
    /// Any key the slot carried before is dropped, and if `key` was attached
    /// to another slot it moves here.
    pub fn mark(&mut self, position: usize, key: &str) -> ContainerResult<Mutation> {
        if let Some(outcome) = self.refuse_if_locked("mark")? {
            return Ok(outcome);
        }
        let len = self.slots.len();
        if position >= len {
            return Err(ContainerError::IndexOutOfRange {
                index: position,
                len,
            });
        }
        validate_key(key)?;
        if let Some(old_key) = self.slots[position].key.take() {
            self.index_of_key.remove(&old_key);
        }
        if let Some(old_pos) = self.index_of_key.insert(key.to_string(), position) {
            self.slots[old_pos].key = None;
        }
        self.slots[position].key = Some(key.to_string());
        Ok(Mutation::Applied)
    }

    /// Remove the value at `key`.
    pub fn delete(&mut self, key: impl Into<Key>) -> ContainerResult<Mutation> {
        Ok(match self.pop(key)? {
            Some(_) => Mutation::Applied,
            None => Mutation::Suppressed,
        })
    }

    /// Remove and return the value at `key`. Returns `Ok(None)` if the
    /// container is read-only.
    pub fn pop(&mut self, key: impl Into<Key>) -> ContainerResult<Option<Value>> {
        if self.refuse_if_locked("pop")?.is_some() {
            return Ok(None);
        }
        match normalize(key.into()) {
            Key::Path(parts) => {
                let (head, tail) = split_head(&parts)?;
                if tail.is_empty() {
                    return self.pop(head);
                }
                let child = self.get_mut(head.clone())?.container_at_mut(&head)?;
                child.pop(Key::Path(tail.to_vec()))
            }
            key => {
                let pos = self.position_of(&key)?;
                Ok(Some(self.remove_at(pos)))
            }
        }
    }

    fn remove_at(&mut self, pos: usize) -> Value {
        let slot = self.slots.remove(pos);
        if let Some(k) = &slot.key {
            self.index_of_key.remove(k);
        }
        for later in &self.slots[pos..] {
            if let Some(k) = &later.key {
                if let Some(mapped) = self.index_of_key.get_mut(k) {
                    *mapped -= 1;
                }
            }
        }
        slot.value
    }

    /// Remove all values and keys.
    pub fn clear(&mut self) -> ContainerResult<Mutation> {
        if let Some(outcome) = self.refuse_if_locked("clear")? {
            return Ok(outcome);
        }
        self.slots.clear();
        self.index_of_key.clear();
        Ok(Mutation::Applied)
    }

    /// Return the nested container at `name`, creating an empty one if absent.
    ///
    /// Fails with [`ContainerError::NotAContainer`] if `name` holds a leaf, and
    /// with [`ContainerError::ReadOnlyViolation`] if the group would have to
    /// be created in a read-only container.
    pub fn create_group(&mut self, name: &str) -> ContainerResult<&mut OrderedContainer> {
        let key = normalize(Key::from(name));
        if !self.contains(key.clone()) {
            if self.refuse_if_locked("create_group")?.is_some() {
                return Err(ContainerError::ReadOnlyViolation {
                    operation: "create_group",
                });
            }
            let group = Value::Nested(self.empty_like());
            self.set_normalized(key.clone(), group)?;
        }
        self.get_mut(key.clone())?.container_at_mut(&key)
    }

    /// Add plain data to this container.
    ///
    /// Sequences (and array leaves) append their elements. Mappings set each
    /// `(key, value)` pair after normalizing the key. With `wrap`, an
    /// integer-like key must equal its position in the mapping, so that
    /// list-like data given as an out-of-order mapping is rejected instead of
    /// being silently reordered. Nested sequences and mappings always become
    /// nested containers.
    pub fn update(&mut self, data: Builtin, wrap: bool) -> ContainerResult<Mutation> {
        if let Some(outcome) = self.refuse_if_locked("update")? {
            return Ok(outcome);
        }
        match data {
            Builtin::Seq(items) => {
                for item in items {
                    let value = self.wrap_value(item)?;
                    self.push_slot(None, value);
                }
            }
            Builtin::Map(pairs) => {
                for (position, (k, v)) in pairs.into_iter().enumerate() {
                    let key = normalize(Key::Name(k));
                    let value = self.wrap_value(v)?;
                    match key {
                        Key::Index(i) if wrap => {
                            if i != position {
                                return Err(ContainerError::InitializerOrderError {
                                    key: i,
                                    position,
                                });
                            }
                            self.push_slot(None, value);
                        }
                        key => {
                            self.set_normalized(key, value)?;
                        }
                    }
                }
            }
            Builtin::Leaf(leaf) => match leaf.array_elements() {
                Some(elements) => {
                    for element in elements {
                        self.push_slot(None, Value::Leaf(element));
                    }
                }
                None => {
                    return Err(ContainerError::InvalidInitializer(
                        leaf.type_name().to_string(),
                    ))
                }
            },
        }
        Ok(Mutation::Applied)
    }

    fn wrap_value(&self, data: Builtin) -> ContainerResult<Value> {
        match data {
            Builtin::Leaf(leaf) => Ok(Value::Leaf(leaf)),
            nested => {
                let mut c = self.empty_like();
                c.update(nested, true)?;
                Ok(Value::Nested(c))
            }
        }
    }

    /// Set every `(key or position, value)` of `other` into this container.
    pub fn merge(&mut self, other: &OrderedContainer) -> ContainerResult<Mutation> {
        if let Some(outcome) = self.refuse_if_locked("merge")? {
            return Ok(outcome);
        }
        for (key, value) in other.iter() {
            self.set_normalized(key, value.clone())?;
        }
        Ok(Mutation::Applied)
    }

    // ---------------------------------------------------------------
    // Iteration
    // ---------------------------------------------------------------

    /// `(key, value)` pairs in slot order; unkeyed slots yield their position.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Value)> + '_ {
        self.slots.iter().enumerate().map(|(i, slot)| {
            let key = match &slot.key {
                Some(k) => Key::Name(k.clone()),
                None => Key::Index(i),
            };
            (key, &slot.value)
        })
    }

    /// `(optional key, value)` pairs in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (Option<&str>, &Value)> + '_ {
        self.slots.iter().map(|s| (s.key.as_deref(), &s.value))
    }

    /// Keys in slot order; unkeyed slots yield their position.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.slots.iter().map(|s| &s.value)
    }

    /// Keys of values that are not nested containers.
    pub fn list_nodes(&self) -> Vec<Key> {
        self.iter()
            .filter(|(_, v)| match v {
                Value::Leaf(_) => true,
                Value::Nested(_) => false,
                Value::Lazy(stub) => !stub.is_group(),
            })
            .map(|(k, _)| k)
            .collect()
    }

    /// Keys of nested containers.
    pub fn list_groups(&self) -> Vec<Key> {
        self.iter()
            .filter(|(_, v)| match v {
                Value::Leaf(_) => false,
                Value::Nested(_) => true,
                Value::Lazy(stub) => stub.is_group(),
            })
            .map(|(k, _)| k)
            .collect()
    }

    /// Find `key` anywhere in the hierarchy, depth first.
    ///
    /// With `stop_on_first_hit` the first match wins; otherwise a second
    /// match is an [`ContainerError::AmbiguousSearch`].
    pub fn search(&self, key: &str, stop_on_first_hit: bool) -> ContainerResult<&Value> {
        match self.search_parent(key, stop_on_first_hit)? {
            Some(parent) => parent.get(Key::Name(key.to_string())),
            None => Err(ContainerError::KeyNotFound(key.to_string())),
        }
    }

    fn search_parent(
        &self,
        key: &str,
        stop_on_first_hit: bool,
    ) -> ContainerResult<Option<&OrderedContainer>> {
        let mut first_hit = None;
        if self.index_of_key.contains_key(key) {
            if stop_on_first_hit {
                return Ok(Some(self));
            }
            first_hit = Some(self);
        }
        for value in self.values() {
            let Value::Nested(child) = value else {
                continue;
            };
            if let Some(hit) = child.search_parent(key, stop_on_first_hit)? {
                if stop_on_first_hit {
                    return Ok(Some(hit));
                }
                if first_hit.is_some() {
                    return Err(ContainerError::AmbiguousSearch(key.to_string()));
                }
                first_hit = Some(hit);
            }
        }
        Ok(first_hit)
    }

    // ---------------------------------------------------------------
    // Conversion
    // ---------------------------------------------------------------

    /// Flatten into plain nested data.
    ///
    /// A container with any key becomes a mapping with every key in string
    /// form (positions as decimals); otherwise it becomes a sequence. With
    /// `stringify`, every leaf is replaced by its display string. That form
    /// is lossy and meant for previews only.
    pub fn to_builtin(&self, stringify: bool) -> ContainerResult<Builtin> {
        let convert = |key: &Key, value: &Value| -> ContainerResult<Builtin> {
            match value {
                Value::Leaf(leaf) if stringify => Ok(Builtin::Leaf(Leaf::Str(leaf.repr()))),
                Value::Leaf(leaf) => Ok(Builtin::Leaf(leaf.clone())),
                Value::Nested(c) => c.to_builtin(stringify),
                Value::Lazy(stub) if stringify => Ok(Builtin::Leaf(Leaf::Str(stub.repr()))),
                Value::Lazy(_) => Err(ContainerError::Unrealized {
                    key: key.to_string(),
                }),
            }
        };
        if self.has_keys() {
            let mut map = IndexMap::with_capacity(self.len());
            for (key, value) in self.iter() {
                let converted = convert(&key, value)?;
                map.insert(key.to_string(), converted);
            }
            Ok(Builtin::Map(map))
        } else {
            let mut seq = Vec::with_capacity(self.len());
            for (key, value) in self.iter() {
                seq.push(convert(&key, value)?);
            }
            Ok(Builtin::Seq(seq))
        }
    }

    // ---------------------------------------------------------------
    // Lazy values
    // ---------------------------------------------------------------

    /// Look up a value, loading any lazily stored value on the way and
    /// caching the loaded value in place.
    pub fn fetch(&mut self, key: impl Into<Key>, registry: &RealizerRegistry) -> ContainerResult<&Value> {
        let (head, tail) = match normalize(key.into()) {
            Key::Path(parts) => {
                let (head, tail) = split_head(&parts)?;
                if let Key::Path(mut inner) = head {
                    inner.extend_from_slice(tail);
                    return self.fetch(Key::Path(inner), registry);
                }
                (head, tail.to_vec())
            }
            key => (key, Vec::new()),
        };
        let pos = self.position_of(&head)?;
        self.realize_slot(pos, registry)?;
        if tail.is_empty() {
            return Ok(&self.slots[pos].value);
        }
        self.slots[pos]
            .value
            .container_at_mut(&head)?
            .fetch(Key::Path(tail), registry)
    }

    fn realize_slot(&mut self, pos: usize, registry: &RealizerRegistry) -> ContainerResult<()> {
        if let Value::Lazy(stub) = &self.slots[pos].value {
            let realized = stub.realize(registry)?;
            self.slots[pos].value = realized;
        }
        Ok(())
    }

    /// Load every lazily stored value, descending into nested containers if
    /// `recursive`.
    pub fn force_load(&mut self, registry: &RealizerRegistry, recursive: bool) -> ContainerResult<()> {
        for pos in 0..self.slots.len() {
            self.realize_slot(pos, registry)?;
            if recursive {
                if let Value::Nested(c) = &mut self.slots[pos].value {
                    c.force_load(registry, true)?;
                }
            }
        }
        Ok(())
    }

    /// Returns `true` if any value in the hierarchy is not loaded yet.
    pub fn has_lazy(&self) -> bool {
        self.values().any(|v| match v {
            Value::Lazy(_) => true,
            Value::Nested(c) => c.has_lazy(),
            Value::Leaf(_) => false,
        })
    }

    /// Fully independent copy with every lazy value loaded.
    ///
    /// `clone()` copies the structure but keeps lazy values pointing at
    /// their stored location.
    pub fn deep_copy(&self, registry: &RealizerRegistry) -> ContainerResult<Self> {
        let mut copy = self.clone();
        copy.force_load(registry, true)?;
        Ok(copy)
    }
}

impl Default for OrderedContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for OrderedContainer {
    /// Same slots in the same order with the same keys, and the same lock
    /// state. Schema and table name are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.read_only == other.read_only && self.slots == other.slots
    }
}

impl fmt::Display for OrderedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.schema.name;
        if self.has_keys() {
            write!(f, "{name}({{")?;
            for (i, (key, value)) in self.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                match key {
                    Key::Name(k) => write!(f, "{k:?}: {}", value.repr())?,
                    other => write!(f, "{other}: {}", value.repr())?,
                }
            }
            f.write_str("})")
        } else {
            write!(f, "{name}([")?;
            for (i, value) in self.values().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(&value.repr())?;
            }
            f.write_str("])")
        }
    }
}
