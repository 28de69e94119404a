use anyhow::bail;

use crate::controllers::paste;
use crate::App;

/// Print a stored paste and its state without counting a view.
pub async fn run(mut app: App, id: &str) -> anyhow::Result<()> {
    let Some(paste) = paste::peek(&mut app.store, id).await? else {
        bail!("no paste stored under id '{id}'");
    };

    let now = app.time.now_ms();

    println!("{}", serde_json::to_string_pretty(&paste)?);
    println!("state: {}", paste.state(now));

    Ok(())
}
