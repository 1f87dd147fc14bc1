//! List registered caption styles.

use captioner_common::config::AppConfig;

pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let registry = super::load_registry(config)?;

    if json {
        let styles: Vec<_> = registry.iter().collect();
        println!("{}", serde_json::to_string_pretty(&styles)?);
        return Ok(());
    }

    println!("Caption styles ({}):", registry.len());
    for style in registry.iter() {
        let key = &style.key;
        let marker = if *key == config.render.default_style {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {key:<18} {:?}, {}px, {:?}{marker}",
            style.anchor, style.typography.font_size_px, style.animation
        );
    }
    Ok(())
}
