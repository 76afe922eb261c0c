//! Testing utilities for Trellis workspace
//!
//! Shared fixtures: a filesystem-like entry tree, plain value builders and
//! producers that count or delay their invocations.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trellis_core::{Builder, Optional, Producer, RefKey, Required, Result, Scaffold, ScaffoldKind};

/// Install a test subscriber honoring `RUST_LOG`; repeat calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Entry tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

impl ScaffoldKind for EntryKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "file",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Directory { name: String, entries: Vec<Arc<Entry>> },
    File { name: String },
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Self::Directory { name, .. } | Self::File { name } => name,
        }
    }

    pub fn entries(&self) -> &[Arc<Entry>] {
        match self {
            Self::Directory { entries, .. } => entries,
            Self::File { .. } => &[],
        }
    }

    /// Levels in this tree counting the entry itself; a file or empty
    /// directory has depth 1
    pub fn depth(&self) -> usize {
        1 + self.entries().iter().map(|entry| entry.depth()).max().unwrap_or(0)
    }
}

pub type EntryScaffold = Scaffold<EntryKind, Arc<Entry>>;

pub struct FileBuilder {
    pub name: Required<String>,
}

impl Default for FileBuilder {
    fn default() -> Self {
        Self {
            name: Required::new("name"),
        }
    }
}

impl Builder for FileBuilder {
    type Output = EntryScaffold;

    fn build(self) -> Result<EntryScaffold> {
        let name = self.name.take("FileBuilder")?;
        Ok(Scaffold::value(Arc::new(Entry::File { name })))
    }
}

pub struct DirectoryBuilder {
    pub name: Required<String>,
    pub entries: Vec<EntryScaffold>,
}

impl Default for DirectoryBuilder {
    fn default() -> Self {
        Self {
            name: Required::new("name"),
            entries: Vec::new(),
        }
    }
}

impl DirectoryBuilder {
    pub fn entry(&mut self, entry: EntryScaffold) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn file(&mut self, name: &str) -> &mut Self {
        self.entry(file(name))
    }
}

impl Builder for DirectoryBuilder {
    type Output = EntryScaffold;

    fn build(self) -> Result<EntryScaffold> {
        let name = self.name.take("DirectoryBuilder")?;
        Ok(Scaffold::composite(self.entries, move |entries| {
            Ok(Arc::new(Entry::Directory { name, entries }))
        }))
    }
}

pub fn file(name: &str) -> EntryScaffold {
    Scaffold::value(Arc::new(Entry::File {
        name: name.to_string(),
    }))
}

pub fn directory(name: &str, entries: Vec<EntryScaffold>) -> EntryScaffold {
    let name = name.to_string();
    Scaffold::composite(entries, move |entries| {
        Ok(Arc::new(Entry::Directory { name, entries }))
    })
}

pub fn directory_key(name: &str) -> RefKey<EntryKind> {
    RefKey::new(EntryKind::Directory, name)
}

pub fn file_key(name: &str) -> RefKey<EntryKind> {
    RefKey::new(EntryKind::File, name)
}

// ---------------------------------------------------------------------------
// Plain values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

pub struct PointBuilder {
    pub x: Required<f64>,
    pub y: Required<f64>,
}

impl Default for PointBuilder {
    fn default() -> Self {
        Self {
            x: Required::new("x"),
            y: Required::new("y"),
        }
    }
}

impl Builder for PointBuilder {
    type Output = Point;

    fn build(self) -> Result<Point> {
        Ok(Point {
            x: self.x.take("PointBuilder")?,
            y: self.y.take("PointBuilder")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub color: String,
    pub stroke_width: f64,
    pub dashed: bool,
}

pub struct StyleBuilder {
    pub color: Required<String>,
    pub stroke_width: Optional<f64>,
    pub dashed: Optional<bool>,
}

impl Default for StyleBuilder {
    fn default() -> Self {
        Self {
            color: Required::new("color"),
            stroke_width: Optional::new(1.0),
            dashed: Optional::new(false),
        }
    }
}

impl Builder for StyleBuilder {
    type Output = Style;

    fn build(self) -> Result<Style> {
        Ok(Style {
            color: self.color.take("StyleBuilder")?,
            stroke_width: self.stroke_width.get(),
            dashed: self.dashed.get(),
        })
    }
}

// ---------------------------------------------------------------------------
// Producers
// ---------------------------------------------------------------------------

/// Producer that bumps `calls` each time it runs
pub fn counting_producer<K, V>(calls: Arc<AtomicUsize>, value: V) -> Producer<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    Producer::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Scaffold::value(value.clone()))
    })
}

/// Producer that sleeps for `delay` before yielding `value`
pub fn delayed_producer<K, V>(delay: Duration, value: V) -> Producer<K, V>
where
    K: ScaffoldKind,
    V: Clone + Send + Sync + 'static,
{
    Producer::from_async(move || {
        let value = value.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(Scaffold::value(value))
        }
    })
}

/// Producer that always fails with an assembly error after `delay`
pub fn failing_producer<K, V>(delay: Duration, message: &'static str) -> Producer<K, V>
where
    K: ScaffoldKind,
    V: Send + 'static,
{
    Producer::from_async(move || async move {
        tokio::time::sleep(delay).await;
        Err(trellis_core::Error::assembly(message))
    })
}
