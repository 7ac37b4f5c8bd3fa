use anyhow::{Context, Result};
use paraimage_infrastructure::TomlPromptLibrary;

const PREVIEW_LEN: usize = 70;

pub fn list(library: &TomlPromptLibrary) -> Result<()> {
    let prompts = library.list().context("Failed to read the prompt library")?;
    if prompts.is_empty() {
        println!("No saved prompts. Add one with `paraimage prompts add`.");
        return Ok(());
    }
    for prompt in prompts {
        println!("{}: {}", prompt.name, one_line(&prompt.text));
    }
    Ok(())
}

pub fn add(library: &TomlPromptLibrary, name: &str, text: &str) -> Result<()> {
    let saved = library.save(name, text).context("Failed to save prompt")?;
    println!("Saved prompt '{}'", saved.name);
    Ok(())
}

pub fn remove(library: &TomlPromptLibrary, name: &str) -> Result<()> {
    if library.remove(name).context("Failed to remove prompt")? {
        println!("Removed prompt '{}'", name.trim());
    } else {
        println!("No prompt named '{}'", name.trim());
    }
    Ok(())
}

/// Collapses whitespace and truncates for a single listing line.
fn one_line(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_LEN {
        flat
    } else {
        let head: String = flat.chars().take(PREVIEW_LEN).collect();
        format!("{}...", head)
    }
}
