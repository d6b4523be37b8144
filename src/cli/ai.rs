//! CLI `tags`, `summarize` and `similar` commands.

use anyhow::Result;

use knowdeck::config::AppConfig;

/// Print suggested tags for `text`.
pub async fn tags(config: &AppConfig, text: &str, json: bool) -> Result<()> {
    let client = super::open_client(config)?;
    let tags = client.generate_tags(text).await;
    client.factory().shutdown();
    let tags = tags?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
    } else if tags.is_empty() {
        println!("No tags found.");
    } else {
        println!("{}", tags.join(", "));
    }
    Ok(())
}

/// Print a short summary of `text`.
pub async fn summarize(config: &AppConfig, text: &str, json: bool) -> Result<()> {
    let client = super::open_client(config)?;
    let summary = client.generate_summary(text).await;
    client.factory().shutdown();
    let summary = summary?;

    if json {
        println!("{}", serde_json::json!({ "summary": summary }));
    } else {
        println!("{summary}");
    }
    Ok(())
}

/// Rank `items` by similarity to `query`.
pub async fn similar(config: &AppConfig, query: &str, items: &[String], json: bool) -> Result<()> {
    let client = super::open_client(config)?;
    let ranked = client.find_similar_content(query, items).await;
    client.factory().shutdown();
    let ranked = ranked?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("No similar items.");
        return Ok(());
    }

    for (rank, item) in ranked.iter().enumerate() {
        let text = item
            .id
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .map(|s| super::preview(s, 80))
            .unwrap_or_default();
        println!("  {}. (score: {:.4}) {}", rank + 1, item.score, text);
    }
    Ok(())
}
