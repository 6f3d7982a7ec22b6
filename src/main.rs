use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

use sportboxd_client::config::Settings;
use sportboxd_client::{
    ApiService, FilterKey, HttpClient, MatchFeed, PreferenceStore, group_by_date_label,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = Settings::new()?;
    let mut prefs = PreferenceStore::load(settings.storage.preferences_path.clone()).await;

    let default_league = settings
        .leagues
        .first()
        .context("no leagues configured")?;
    let league = prefs
        .selected_league()
        .unwrap_or(&default_league.code)
        .to_string();
    let date = prefs.selected_date();
    let order = prefs.selected_order().unwrap_or_default();

    let label = settings
        .leagues
        .iter()
        .find(|l| l.code == league)
        .map(|l| l.label.as_str())
        .unwrap_or(league.as_str());
    println!("League: {}", label);

    let client = Arc::new(HttpClient::new(&settings.api)?);
    let api = ApiService::new(client, &settings);

    let filter = FilterKey::new(league.as_str())
        .with_date(date)
        .with_order(order);
    let mut feed = MatchFeed::new(api.clone(), filter);

    while feed.has_next_page() {
        feed.fetch_next_page().await;
    }

    let matches = feed.matches();
    // Date labels use the same display clock the kickoffs are shifted to.
    let today = (Utc::now() + Duration::hours(settings.display.kickoff_offset_hours)).date_naive();

    if matches.is_empty() {
        println!(
            "Parece que não encontramos partidas nas datas/ligas selecionadas, \
             que tal mudar os filtros?"
        );
    } else if order.is_chronological() {
        for group in group_by_date_label(&matches, today) {
            println!("\n{}", group.label);
            for summary in &group.matches {
                println!(
                    "  {} {} x {} {}  {}/5 ({} avaliações)",
                    summary.home_team,
                    summary.home_score,
                    summary.away_score,
                    summary.away_team,
                    summary.display_rating(),
                    summary.ratings_num
                );
            }
        }
    } else {
        println!();
        for summary in &matches {
            println!(
                "  {} {} x {} {}  {}/5 ({} avaliações)",
                summary.home_team,
                summary.home_score,
                summary.away_score,
                summary.away_team,
                summary.display_rating(),
                summary.ratings_num
            );
        }
    }

    println!(
        "\nFetched {} of {} matches in {} pages",
        matches.len(),
        feed.total_count(),
        feed.pages_fetched()
    );

    if let Some(first) = matches.first() {
        let detail = api.fetch_match(&first.match_id).await;
        let ratings = api.fetch_ratings(&first.match_id, None).await;

        println!(
            "\n{} {} x {} {}  {}/5",
            detail.home_team,
            detail.home_score,
            detail.away_score,
            detail.away_team,
            detail.display_rating()
        );
        for rating in ratings.iter().take(5) {
            println!(
                "  \"{}\" por {} ({}/5)",
                rating.title, rating.author, rating.rating
            );
        }
    }

    prefs.set_selected_league(&league).await?;
    prefs.set_selected_date(date).await?;
    prefs.set_selected_order(order).await?;

    Ok(())
}
