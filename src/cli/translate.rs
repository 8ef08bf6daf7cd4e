use anyhow::Result;

use saathi::config::SaathiConfig;

/// Translate one line of text to Hindi.
pub async fn translate(config: &SaathiConfig, text: &str) -> Result<()> {
    let mut runtime = super::start(config, false).await?;
    if let Some(translated) = runtime.session.translate(text).await {
        println!("{translated}");
    }
    super::drain_notices(&mut runtime.notices);
    Ok(())
}
