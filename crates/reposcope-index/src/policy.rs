//! Path inclusion rules applied during discovery. Pure functions of the path
//! string; no I/O.

const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    "out",
    "coverage",
    ".turbo",
    ".vercel",
    ".cache",
    "public/assets",
    "public/images",
    ".husky",
    ".vscode",
    ".idea",
];

const LOCK_FILES: &[&str] = &["package-lock.json", "pnpm-lock.yaml", "yarn.lock", "bun.lockb"];

const CONFIG_FILES: &[&str] = &[
    "eslint.config.mjs",
    "eslint.config.js",
    ".eslintrc",
    ".eslintrc.js",
    ".eslintrc.json",
    ".prettierrc",
    ".prettierrc.js",
    ".prettierrc.json",
    "prettier.config.js",
    "next.config.mjs",
    "next.config.ts",
    "next.config.js",
    "components.json",
    "postcss.config.js",
    "postcss.config.mjs",
    ".editorconfig",
    ".nvmrc",
    ".npmrc",
    "vercel.json",
    ".gitignore",
    ".gitattributes",
];

const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "svg", "webp", "bmp", "tiff", "pdf", "zip", "tar", "gz",
    "rar", "7z", "exe", "dmg", "woff", "woff2", "ttf", "eot", "mp4", "mp3", "wav", "avi", "mov",
];

const EXCLUDED_PREFIXES: &[&str] = &["license", "licence", "changelog"];

#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    dirs: Vec<String>,
    files: Vec<String>,
    extensions: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        let owned = |list: &[&str]| -> Vec<String> { list.iter().map(|s| (*s).to_owned()).collect() };
        Self {
            dirs: owned(EXCLUDED_DIRS),
            files: [owned(LOCK_FILES), owned(CONFIG_FILES)].concat(),
            extensions: owned(BINARY_EXTENSIONS),
            prefixes: owned(EXCLUDED_PREFIXES),
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl ExclusionPolicy {
    /// Adds directory names to skip. Entries containing `/` match as a path
    /// suffix, others match the final segment exactly.
    #[must_use]
    pub fn with_extra_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn is_excluded_dir(&self, path: &str) -> bool {
        let path = path.trim_matches('/');
        let name = file_name(path);
        self.dirs.iter().any(|d| {
            if d.contains('/') {
                path == d || path.ends_with(&format!("/{d}"))
            } else {
                name == d
            }
        })
    }

    #[must_use]
    pub fn includes_file(&self, path: &str) -> bool {
        let name = file_name(path);
        if name.is_empty() {
            return false;
        }
        if self.files.iter().any(|f| f == name) {
            return false;
        }
        if name.starts_with(".env") {
            return false;
        }
        if let Some((_, ext)) = name.rsplit_once('.')
            && self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        {
            return false;
        }
        if path.ends_with(".map") {
            return false;
        }
        let lower = name.to_ascii_lowercase();
        !self.prefixes.iter().any(|p| lower.starts_with(p.as_str()))
    }
}
