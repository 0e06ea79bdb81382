// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides temp-dir template fixtures and output normalization

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use viewset::{Config, Loader};

/// A temporary directory of template files, plus loaders over it.
pub struct TemplateFixture {
    dir: TempDir,
}

impl TemplateFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Writes a file below the fixture root, creating parent directories.
    pub fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn loader(&self, auto_reload: bool) -> Loader {
        let conf = Config {
            directories: vec![self.dir.path().to_path_buf()],
            auto_reload,
            ..Default::default()
        };
        Loader::new(conf).unwrap()
    }
}

/// The fixture set most tests run against: a layout with a content slot,
/// a page defining the slot inline, and a standalone content page.
pub fn standard_fixture() -> TemplateFixture {
    let fixture = TemplateFixture::new();
    fixture.file("layout.html", "<html> <body> {{> content}} </body> </html>");
    fixture.file(
        "pages/home.html",
        "{{#*inline \"content\"}}<h1>Home</h1>{{/inline}}",
    );
    fixture.file("pages/content.html", "<h1>Content</h1>");
    fixture
}

/// Collapses whitespace runs so assertions are layout-insensitive.
pub fn shrink_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
