// crates/network/examples/route_and_artwork.rs
//! Picks a server route and fetches one cover through the artwork cache
//!
//! Usage: route_and_artwork <primary-url> <secondary-url> <user> <password> <cover-id>

use std::sync::Arc;
use sublink_network::{
    ApiClient, ArtworkCache, Client, ConnectionCategory, ConnectivityMonitor, Credentials,
    EndpointCandidates, HttpTransport, ImageSize, ResourceFetcher, RouteSelector,
};
use sublink_resilience::RequestThrottler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 5 {
        eprintln!("usage: route_and_artwork <primary-url> <secondary-url> <user> <password> <cover-id>");
        std::process::exit(2);
    }

    println!("🔀 Route + artwork example\n");

    let transport: Arc<dyn HttpTransport> = Arc::new(Client::new()?);
    let monitor = Arc::new(ConnectivityMonitor::new(ConnectionCategory::WiFi));
    let credentials = Credentials::new(args[2].clone(), args[3].clone());

    let candidates = EndpointCandidates::new(Some(args[0].clone()), Some(args[1].clone()));
    let selector = RouteSelector::new(transport.clone(), monitor);
    let route = selector.select(&candidates, &credentials).await;
    println!("Route: {}", route);

    let Some(base_url) = route.selected_url() else {
        return Ok(());
    };

    let fetcher = ResourceFetcher::new(transport);
    let api = ApiClient::new(base_url, credentials, fetcher.clone());
    let cover_url = api.cover_art_url(&args[4], ImageSize::Original)?;

    let dir = tempfile::tempdir()?;
    let cache = ArtworkCache::open(dir.path(), RequestThrottler::default(), fetcher)?;

    for pass in 1..=2 {
        let artwork = cache.get(&cover_url).await;
        match artwork.source() {
            Some(source) => println!(
                "Pass {}: {} bytes from {:?}",
                pass,
                artwork.bytes().map(|b| b.len()).unwrap_or(0),
                source
            ),
            None => println!("Pass {}: placeholder", pass),
        }
    }

    Ok(())
}
