use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tera::{Context, Tera};

use crate::errors::PromptError;

/// Get the path to the prompts directory shipped with this crate
pub fn prompts_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("prompts")
}

/// Get the path to a named agent's prompt directory
pub fn agent_prompts_dir(agent: &str) -> PathBuf {
    prompts_dir().join(agent)
}

/// A named set of prompt templates loaded from one or more directories.
///
/// Every `*.md` file in each directory becomes a template keyed by its file
/// stem. When the same name appears in multiple directories, the directory
/// supplied later wins, so agent-specific directories can override the common
/// set. Directories that do not exist are skipped silently, since
/// agent-specific prompt directories are optional.
pub struct PromptSet {
    templates: HashMap<String, String>,
    tera: Tera,
}

impl PromptSet {
    pub fn load<P: AsRef<Path>>(dirs: &[P]) -> Result<Self, PromptError> {
        let mut templates = HashMap::new();
        for dir in dirs {
            let dir = dir.as_ref();
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                templates.insert(name.to_string(), fs::read_to_string(&path)?);
            }
        }

        let mut tera = Tera::default();
        for (name, content) in &templates {
            tera.add_raw_template(name, content)?;
        }

        Ok(PromptSet { templates, tera })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render the named template with the supplied context. Fails when the
    /// name is unknown or when the template references an unsupplied key.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, PromptError> {
        if !self.templates.contains_key(name) {
            return Err(PromptError::NotFound(name.to_string()));
        }
        Ok(self.tera.render(name, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_prompt(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(format!("{name}.md")), content).unwrap();
    }

    #[test]
    fn test_render_with_kwargs() {
        let dir = tempfile::tempdir().unwrap();
        write_prompt(dir.path(), "greeting", "Hello, {{ name }}!");

        let set = PromptSet::load(&[dir.path()]).unwrap();
        let mut context = Context::new();
        context.insert("name", "Alice");
        assert_eq!(set.render("greeting", &context).unwrap(), "Hello, Alice!");
    }

    #[test]
    fn test_later_directory_overrides_earlier() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_prompt(first.path(), "x", "from first");
        write_prompt(second.path(), "x", "from second");

        let set = PromptSet::load(&[first.path(), second.path()]).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.render("x", &Context::new()).unwrap(),
            "from second"
        );
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_prompt(dir.path(), "only", "here");

        let missing = dir.path().join("does-not-exist");
        let set = PromptSet::load(&[dir.path().to_path_buf(), missing]).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("only"));
    }

    #[test]
    fn test_unknown_template_fails() {
        let dir = tempfile::tempdir().unwrap();
        let set = PromptSet::load(&[dir.path()]).unwrap();
        let err = set.render("absent", &Context::new()).unwrap_err();
        assert!(matches!(err, PromptError::NotFound(name) if name == "absent"));
    }

    #[test]
    fn test_missing_variable_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_prompt(dir.path(), "greeting", "Hello, {{ name }}!");

        let set = PromptSet::load(&[dir.path()]).unwrap();
        let err = set.render("greeting", &Context::new()).unwrap_err();
        assert!(matches!(err, PromptError::Render(_)));
    }

    #[test]
    fn test_non_markdown_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_prompt(dir.path(), "kept", "kept");
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = PromptSet::load(&[dir.path()]).unwrap();
        assert_eq!(set.len(), 1);
    }
}
