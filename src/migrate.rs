use color_eyre::Result;
use color_eyre::eyre::Context;
use reqwest::Client;
use url::Url;

use crate::config::Config;
use crate::executor::MigrationExecutor;
use crate::http::HttpSender;
use crate::planner::{MigrationPlanner, Selection};
use crate::ports::source::SourceApi;
use crate::progress::{FanoutObserver, LogObserver, MigrationObserver, ProgressBarObserver};
use crate::selection::{
    Category, SelectionError, prompt_categories, prompt_playlists, select_by_name,
};
use crate::source::SourceClient;
use crate::spotify_rs;
use crate::spotify_rs::auth::SpotifyTokenRefresher;
use crate::spotify_rs::client::SpotifyClient;
use crate::tidal_rs;
use crate::tidal_rs::auth::TidalTokenRefresher;
use crate::tidal_rs::client::TidalClient;

/// Options of the `migrate` command.
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub playlists: Vec<String>,
    pub all_playlists: bool,
    pub liked: bool,
    pub concurrency: Option<usize>,
    pub progress: bool,
}

impl MigrateOptions {
    /// Whether any flag already says what to migrate, so no prompt is needed.
    fn has_selection_flags(&self) -> bool {
        !self.playlists.is_empty() || self.all_playlists || self.liked
    }
}

/// Build the selection from command line flags, without prompting.
pub async fn selection_from_flags<A: SourceApi>(
    source: &SourceClient<A>,
    options: &MigrateOptions,
) -> Result<Selection> {
    let playlists = if options.all_playlists {
        source.list_playlists().await?
    } else if !options.playlists.is_empty() {
        select_by_name(source.list_playlists().await?, &options.playlists)?
    } else {
        Vec::new()
    };

    Ok(Selection {
        playlists,
        liked_tracks: options.liked,
    })
}

async fn prompt_selection<A: SourceApi>(source: &SourceClient<A>) -> Result<Selection> {
    let categories = prompt_categories().await?;
    let mut selection = Selection {
        playlists: Vec::new(),
        liked_tracks: categories.contains(&Category::LikedTracks),
    };

    if categories.contains(&Category::Playlists) {
        let playlists = source
            .list_playlists()
            .await
            .wrap_err("Error at selecting playlists")?;
        selection.playlists = prompt_playlists(playlists).await?;
    }
    Ok(selection)
}

async fn sign_in_spotify(client: &Client, config: &Config) -> Result<SourceClient<SpotifyClient>> {
    let credentials = config.spotify_credentials()?;
    let accounts_url = Url::parse(spotify_rs::auth::SPOTIFY_ACCOUNTS_URL)?;
    let token = spotify_rs::auth::authenticate(client, &accounts_url, &credentials)
        .await
        .wrap_err("Spotify authentication failed")?;

    let mut api = SpotifyClient::new(
        token.access_token,
        Url::parse(spotify_rs::client::SPOTIFY_API_URL)?,
        HttpSender::new(client.clone(), config.request_policy()),
    );
    if let Some(refresh_token) = token.refresh_token {
        api = api.with_refresher(SpotifyTokenRefresher::new(
            client.clone(),
            accounts_url,
            credentials,
            refresh_token,
        ));
    }
    let user = api
        .get_current_user()
        .await
        .wrap_err("Failed to read Spotify profile")?;
    println!(
        "Spotify signed in as: {}",
        user.display_name.unwrap_or(user.id)
    );

    Ok(SourceClient::new(api).with_page_size(config.migration.page_size))
}

async fn sign_in_tidal(client: &Client, config: &Config) -> Result<TidalClient> {
    let credentials = config.tidal_credentials()?;
    let auth_url = Url::parse(tidal_rs::auth::TIDAL_AUTH_URL)?;
    let session = tidal_rs::auth::authenticate(client, &auth_url, &credentials)
        .await
        .wrap_err("Tidal authentication failed")?;

    let refresh_token = session.refresh_token.clone();
    let mut tidal = TidalClient::new(
        session,
        Url::parse(tidal_rs::client::TIDAL_API_URL)?,
        Url::parse(tidal_rs::client::TIDAL_OPENAPI_URL)?,
        HttpSender::new(client.clone(), config.request_policy()),
    );
    if let Some(refresh_token) = refresh_token {
        tidal = tidal.with_refresher(TidalTokenRefresher::new(
            client.clone(),
            auth_url,
            credentials,
            refresh_token,
        ));
    }
    println!("Tidal signed in as: {}", tidal.username());
    Ok(tidal)
}

/// The whole interactive migration: sign in to both services, choose, plan, execute, summarize.
pub async fn run(config: &Config, options: MigrateOptions) -> Result<()> {
    println!("Welcome to the Spotify -> Tidal migration tool!");

    let client = Client::new();
    let source = sign_in_spotify(&client, config).await?;
    let destination = sign_in_tidal(&client, config).await?;

    let selection = if options.has_selection_flags() {
        selection_from_flags(&source, &options).await?
    } else {
        match prompt_selection(&source).await {
            Err(e)
                if matches!(
                    e.downcast_ref::<SelectionError>(),
                    Some(SelectionError::Cancelled)
                ) =>
            {
                println!("Selection cancelled - Exiting");
                return Ok(());
            }
            result => result?,
        }
    };
    if selection.is_empty() {
        println!("Nothing selected - Exiting");
        return Ok(());
    }

    let jobs = MigrationPlanner::new(&source).plan(&selection).await?;

    let mut observers: Vec<Box<dyn MigrationObserver>> = vec![Box::new(LogObserver)];
    if options.progress {
        observers.push(Box::new(ProgressBarObserver::new()));
    }
    let observer = FanoutObserver::new(observers);

    println!("\nStarting migration ...\n");
    let summary = MigrationExecutor::new(&source, &destination, &observer)
        .with_concurrency(options.concurrency.unwrap_or(config.migration.concurrency))
        .run(jobs)
        .await;

    println!("{}", summary);
    if summary.has_failures() {
        log::warn!("Some items failed to migrate, see the summary above");
    }
    println!("migration done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Playlist;
    use crate::paginator::Page;
    use crate::ports::source::MockSourceApi;

    fn playlist(id: &str, name: &str) -> Playlist {
        Playlist {
            id: id.into(),
            name: name.into(),
            description: None,
            total_tracks: 3,
        }
    }

    fn source_with_playlists() -> SourceClient<MockSourceApi> {
        let mut api = MockSourceApi::new();
        api.expect_playlists_page().returning(|_, _| {
            Ok(Page {
                items: vec![playlist("p1", "Road Trip"), playlist("p2", "Focus")],
                total: 2,
                has_next: false,
            })
        });
        SourceClient::new(api)
    }

    #[test]
    fn test_no_flags_means_prompt() {
        assert!(!MigrateOptions::default().has_selection_flags());
        assert!(
            MigrateOptions {
                liked: true,
                ..Default::default()
            }
            .has_selection_flags()
        );
    }

    #[tokio::test]
    async fn test_all_playlists_and_liked() {
        let source = source_with_playlists();
        let options = MigrateOptions {
            all_playlists: true,
            liked: true,
            ..Default::default()
        };

        let selection = selection_from_flags(&source, &options).await.unwrap();

        assert_eq!(selection.playlists.len(), 2);
        assert!(selection.liked_tracks);
    }

    #[tokio::test]
    async fn test_liked_only_does_not_list_playlists() {
        let source = SourceClient::new(MockSourceApi::new());
        let options = MigrateOptions {
            liked: true,
            ..Default::default()
        };

        let selection = selection_from_flags(&source, &options).await.unwrap();

        assert!(selection.playlists.is_empty());
        assert!(selection.liked_tracks);
    }

    #[tokio::test]
    async fn test_unknown_playlist_name_is_an_error() {
        let source = source_with_playlists();
        let options = MigrateOptions {
            playlists: vec!["Focus".into(), "Missing".into()],
            ..Default::default()
        };

        let error = selection_from_flags(&source, &options).await.unwrap_err();

        assert!(matches!(
            error.downcast_ref::<SelectionError>(),
            Some(SelectionError::UnknownPlaylists(names)) if names == &vec!["Missing".to_string()]
        ));
    }
}
