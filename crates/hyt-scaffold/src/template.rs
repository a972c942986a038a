//! Copying a template directory into a new project.
//!
//! A template is an ordinary Gradle plugin project containing placeholders.
//! Every placeholder is replaced in the contents of text files and in file
//! and directory names:
//!
//! | Placeholder            | Replaced with         | `my-plugin` becomes |
//! |------------------------|-----------------------|---------------------|
//! | [`NAME_PLACEHOLDER`]   | the name as given     | `my-plugin`         |
//! | [`CLASS_PLACEHOLDER`]  | `PascalCase` name     | `MyPlugin`          |
//! | [`PACKAGE_PLACEHOLDER`]| lower-case identifier | `myplugin`          |
//!
//! Build output, Gradle caches and VCS metadata in the template are not
//! copied. File permissions are kept, so `gradlew` stays executable.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tracing::{debug, info};

use crate::error::ScaffoldError;
use crate::name::PluginName;

/// Replaced with the plugin name as given.
pub const NAME_PLACEHOLDER: &str = "__PLUGIN_NAME__";

/// Replaced with the `PascalCase` class name.
pub const CLASS_PLACEHOLDER: &str = "__PLUGIN_CLASS__";

/// Replaced with the lower-case package segment.
pub const PACKAGE_PLACEHOLDER: &str = "__PLUGIN_PACKAGE__";

/// Extensions of files whose contents are rewritten.
const TEXT_EXTENSIONS: &[&str] = &[
    "java",
    "kt",
    "kts",
    "gradle",
    "json",
    "xml",
    "properties",
    "md",
    "txt",
];

/// Extensionless files whose contents are rewritten.
const TEXT_FILE_NAMES: &[&str] = &["gradlew", ".gitignore"];

/// Template directories that are never copied.
const SKIPPED_DIRS: &[&str] = &[".git", ".gradle", "build"];

/// What [`scaffold`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldReport {
    /// Files written, relative to the destination.
    pub files: Vec<Utf8PathBuf>,
    /// How many of them had placeholders replaced in their contents.
    pub rewritten: usize,
}

/// Returns `true` if the contents of `path` are rewritten.
#[must_use]
pub fn is_text_file(path: &Utf8Path) -> bool {
    path.file_name().is_some_and(|n| TEXT_FILE_NAMES.contains(&n))
        || path
            .extension()
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Replaces every placeholder in `text`.
///
/// # Examples
///
/// ```
/// use hyt_scaffold::{PluginName, render};
///
/// let name = PluginName::parse("better-mobs")?;
/// assert_eq!(
///     render("package com.example.__PLUGIN_PACKAGE__; class __PLUGIN_CLASS__ {}", &name),
///     "package com.example.bettermobs; class BetterMobs {}"
/// );
/// # Ok::<(), hyt_scaffold::ScaffoldError>(())
/// ```
#[must_use]
pub fn render(text: &str, name: &PluginName) -> String {
    text.replace(NAME_PLACEHOLDER, name.as_str())
        .replace(CLASS_PLACEHOLDER, name.class_name())
        .replace(PACKAGE_PLACEHOLDER, name.package_name())
}

/// Creates a project at `dest` from the template at `template`.
///
/// `dest` must not exist or must be an empty directory.
///
/// # Errors
///
/// Returns [`ScaffoldError::TemplateNotFound`] for a missing template,
/// [`ScaffoldError::DestinationExists`] if `dest` has content, and an I/O
/// or walk error if copying fails part way.
pub fn scaffold(
    template: &Utf8Path,
    dest: &Utf8Path,
    name: &PluginName,
) -> Result<ScaffoldReport, ScaffoldError> {
    if !template.is_dir() {
        return Err(ScaffoldError::TemplateNotFound(template.to_owned()));
    }
    if dest.exists() {
        let mut entries = dest.read_dir_utf8().map_err(|e| ScaffoldError::io(dest, e))?;
        if entries.next().is_some() {
            return Err(ScaffoldError::DestinationExists(dest.to_owned()));
        }
    }
    fs::create_dir_all(dest).map_err(|e| ScaffoldError::io(dest, e))?;

    let walker = WalkBuilder::new(template)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(std::ffi::OsStr::cmp)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && entry.file_name().to_str().is_some_and(|n| SKIPPED_DIRS.contains(&n)))
        })
        .build();

    let mut report = ScaffoldReport::default();
    for entry in walker {
        let entry = entry?;
        let source = Utf8PathBuf::from_path_buf(entry.into_path())
            .map_err(ScaffoldError::NonUtf8Path)?;
        let Ok(relative) = source.strip_prefix(template) else {
            continue;
        };
        if relative.as_str().is_empty() {
            continue;
        }

        let relative = Utf8PathBuf::from(render(relative.as_str(), name));
        let target = dest.join(&relative);

        if source.is_dir() {
            fs::create_dir_all(&target).map_err(|e| ScaffoldError::io(&target, e))?;
            continue;
        }

        if copy_file(&source, &target, name)? {
            report.rewritten += 1;
        }
        debug!(file = %relative, "Created");
        report.files.push(relative);
    }

    info!(
        template = %template,
        dest = %dest,
        files = report.files.len(),
        "Project created"
    );
    Ok(report)
}

/// Copies one file, replacing placeholders in text files. Returns `true` if
/// the contents changed.
fn copy_file(
    source: &Utf8Path,
    target: &Utf8Path,
    name: &PluginName,
) -> Result<bool, ScaffoldError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ScaffoldError::io(parent, e))?;
    }
    fs::copy(source, target).map_err(|e| ScaffoldError::io(target, e))?;

    if !is_text_file(source) {
        return Ok(false);
    }
    // Files that turn out not to be UTF-8 are kept as copied.
    let Ok(text) = fs::read_to_string(target) else {
        return Ok(false);
    };
    let rendered = render(&text, name);
    if rendered == text {
        return Ok(false);
    }
    fs::write(target, rendered).map_err(|e| ScaffoldError::io(target, e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, path)
    }

    fn write_file(path: &Utf8Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// A small plugin template with placeholders in names and contents.
    fn template(root: &Utf8Path) -> Utf8PathBuf {
        let t = root.join("template");
        write_file(
            &t.join("settings.gradle"),
            b"rootProject.name = '__PLUGIN_NAME__'\n",
        );
        write_file(
            &t.join("src/main/java/com/example/__PLUGIN_PACKAGE__/__PLUGIN_CLASS__.java"),
            b"package com.example.__PLUGIN_PACKAGE__;\n\npublic class __PLUGIN_CLASS__ {}\n",
        );
        write_file(
            &t.join("src/main/resources/manifest.json"),
            b"{\"Name\": \"__PLUGIN_NAME__\", \"Main\": \"com.example.__PLUGIN_PACKAGE__.__PLUGIN_CLASS__\"}\n",
        );
        write_file(&t.join("gradle/wrapper/gradle-wrapper.jar"), &[0x50, 0x4B, 0x03, 0x04]);
        write_file(&t.join("build/libs/stale.jar"), b"stale");
        write_file(&t.join(".gradle/8.10/fileHashes.lock"), b"lock");
        write_file(&t.join(".gitignore"), b"build/\n.gradle/\n");
        t
    }

    #[test]
    fn test_is_text_file() {
        assert!(is_text_file(Utf8Path::new("build.gradle")));
        assert!(is_text_file(Utf8Path::new("src/Main.JAVA")));
        assert!(is_text_file(Utf8Path::new("gradlew")));
        assert!(!is_text_file(Utf8Path::new("gradlew.bat")));
        assert!(!is_text_file(Utf8Path::new("gradle/wrapper/gradle-wrapper.jar")));
    }

    #[test]
    fn test_scaffold_renders_names_and_contents() {
        let (_dir, root) = temp_root();
        let template = template(&root);
        let dest = root.join("better-mobs");
        let name = PluginName::parse("better-mobs").unwrap();

        let report = scaffold(&template, &dest, &name).unwrap();

        let main = dest.join("src/main/java/com/example/bettermobs/BetterMobs.java");
        assert_eq!(
            fs::read_to_string(&main).unwrap(),
            "package com.example.bettermobs;\n\npublic class BetterMobs {}\n"
        );
        assert_eq!(
            fs::read_to_string(dest.join("settings.gradle")).unwrap(),
            "rootProject.name = 'better-mobs'\n"
        );
        assert!(
            fs::read_to_string(dest.join("src/main/resources/manifest.json"))
                .unwrap()
                .contains("com.example.bettermobs.BetterMobs")
        );
        assert_eq!(
            fs::read(dest.join("gradle/wrapper/gradle-wrapper.jar")).unwrap(),
            [0x50, 0x4B, 0x03, 0x04]
        );
        assert_eq!(report.files.len(), 5);
        assert_eq!(report.rewritten, 3);
    }

    #[test]
    fn test_scaffold_skips_build_output_and_caches() {
        let (_dir, root) = temp_root();
        let template = template(&root);
        let dest = root.join("plugin");

        scaffold(&template, &dest, &PluginName::parse("plugin").unwrap()).unwrap();

        assert!(!dest.join("build").exists());
        assert!(!dest.join(".gradle").exists());
        assert!(dest.join(".gitignore").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_scaffold_keeps_wrapper_executable() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, root) = temp_root();
        let template = template(&root);
        let gradlew = template.join("gradlew");
        write_file(&gradlew, b"#!/bin/sh\n# __PLUGIN_NAME__\n");
        fs::set_permissions(&gradlew, fs::Permissions::from_mode(0o755)).unwrap();

        let dest = root.join("plugin");
        scaffold(&template, &dest, &PluginName::parse("plugin").unwrap()).unwrap();

        let copied = dest.join("gradlew");
        assert_eq!(fs::read_to_string(&copied).unwrap(), "#!/bin/sh\n# plugin\n");
        let mode = fs::metadata(&copied).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_scaffold_into_empty_directory() {
        let (_dir, root) = temp_root();
        let template = template(&root);
        let dest = root.join("empty");
        fs::create_dir(&dest).unwrap();

        let report = scaffold(&template, &dest, &PluginName::parse("empty").unwrap()).unwrap();
        assert!(!report.files.is_empty());
    }

    #[test]
    fn test_scaffold_refuses_non_empty_destination() {
        let (_dir, root) = temp_root();
        let template = template(&root);
        let dest = root.join("existing");
        write_file(&dest.join("README.md"), b"mine");

        let err = scaffold(&template, &dest, &PluginName::parse("existing").unwrap()).unwrap_err();
        assert!(matches!(err, ScaffoldError::DestinationExists(_)));
        assert_eq!(fs::read_to_string(dest.join("README.md")).unwrap(), "mine");
    }

    #[test]
    fn test_scaffold_missing_template() {
        let (_dir, root) = temp_root();
        let err = scaffold(
            &root.join("nope"),
            &root.join("plugin"),
            &PluginName::parse("plugin").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, ScaffoldError::TemplateNotFound(_)));
        assert!(!root.join("plugin").exists());
    }
}
