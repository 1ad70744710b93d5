//! File trees and overlay merging
//!
//! A file tree maps a path to its content; the path is the key so it can never
//! be duplicated. Generation produces partial trees (overlays) that are merged
//! on top of the base skeleton and whatever the workspace already holds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque text payload of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub code: String,
}

impl FileContent {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Path to content. Iteration order carries no meaning.
pub type FileTree = BTreeMap<String, FileContent>;

/// Merge `overlay` on top of `skeleton` into a new tree.
///
/// The result holds the union of both path sets; for paths present in both the
/// overlay wins. Neither input is touched.
pub fn merge(skeleton: &FileTree, overlay: &FileTree) -> FileTree {
    let mut merged = skeleton.clone();
    merged.extend(
        overlay
            .iter()
            .map(|(path, content)| (path.clone(), content.clone())),
    );
    merged
}

/// Paths of `overlay` that replace an existing path in `base`.
pub fn replaced_paths<'a>(base: &FileTree, overlay: &'a FileTree) -> Vec<&'a str> {
    overlay
        .keys()
        .filter(|path| base.contains_key(*path))
        .map(String::as_str)
        .collect()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <script src="https://cdn.tailwindcss.com"></script>
  </head>
  <body>
    <div id="root"></div>
  </body>
</html>"#;

const APP_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;";

const TAILWIND_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
module.exports = {
  content: [
    "./src/**/*.{js,jsx,ts,tsx}",
  ],
  theme: {
    extend: {},
  },
  plugins: [],
}"#;

const POSTCSS_CONFIG: &str = r#"/** @type {import('postcss-load-config').Config} */
const config = {
  plugins: {
    tailwindcss: {},
  },
};

export default config;"#;

/// The React + Tailwind starter tree every workspace is rendered on top of.
pub fn default_skeleton() -> FileTree {
    [
        ("/public/index.html", INDEX_HTML),
        ("/App.css", APP_CSS),
        ("/tailwind.config.js", TAILWIND_CONFIG),
        ("/postcss.config.js", POSTCSS_CONFIG),
    ]
    .into_iter()
    .map(|(path, code)| (path.to_string(), FileContent::new(code)))
    .collect()
}
