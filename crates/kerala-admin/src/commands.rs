//! Command handlers

use crate::{
    AboutCommands, BannerCommands, Commands, ConfigCommands, GalleryCommands, SlideArg,
    TourCommands,
};
use anyhow::{Context, Result, bail};
use kerala_client::{
    AboutEditor, ApiClient, BannerEditor, BookingFlow, ClientResult, Confirm, GalleryEditor,
    LoadState, Notice, NoticeLevel, Outcome, ToursView,
};
use kerala_core::{
    BannerSlot, BlockId, Config, ImageUpload, Session, SessionStore, UploadPolicy, User,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatch a parsed command
///
/// # Errors
///
/// Returns error if the command fails
pub(super) async fn run(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Login { name, email } => login(config, name, email).await,
        Commands::Logout => logout(config).await,
        Commands::Whoami => whoami(config).await,
        Commands::Dashboard => dashboard(config).await,
        Commands::About { action } => about(config, action).await,
        Commands::Banner { action } => banner(config, action).await,
        Commands::Gallery { action } => gallery(config, action).await,
        Commands::Tours { action } => tours(config, action).await,
        Commands::Config { action } => match action {
            ConfigCommands::Show => show_config(config),
        },
    }
}

fn backend(config: &Config) -> Result<Arc<ApiClient>> {
    Ok(Arc::new(
        ApiClient::from_config(&config.api).context("Failed to create HTTP client")?,
    ))
}

async fn session(config: &Config) -> Result<(SessionStore, Session)> {
    let store = SessionStore::from_config(&config.session)?;
    let session = store.load().await?;
    debug!(path = %store.path().display(), "Session loaded");
    Ok((store, session))
}

/// Print a notice the way the site would alert it
fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => println!("{}", notice.message),
        NoticeLevel::Error => eprintln!("Error: {}", notice.message),
    }
}

/// Print the outcome of a mutation, preferring the editor's notice on failure
fn report(result: ClientResult<Notice>, notice: Option<Notice>) -> Result<()> {
    match result {
        Ok(notice) => {
            print_notice(&notice);
            Ok(())
        }
        Err(err) => {
            if let Some(notice) = notice {
                print_notice(&notice);
            }
            Err(err.into())
        }
    }
}

fn report_outcome(result: ClientResult<Outcome>, notice: Option<Notice>) -> Result<()> {
    match result {
        Ok(Outcome::Applied(notice)) => {
            print_notice(&notice);
            Ok(())
        }
        Ok(Outcome::Cancelled) => {
            println!("Cancelled");
            Ok(())
        }
        Err(err) => report(Err(err), notice),
    }
}

/// Ask on stdin; anything but `y`/`yes` declines
fn ask(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

const fn assume_yes(_prompt: &str) -> bool {
    true
}

const fn confirmer(yes: bool) -> &'static (dyn Confirm + Sync) {
    if yes {
        return &assume_yes;
    }
    &ask
}

async fn read_image(path: &Path, policy: &UploadPolicy) -> Result<ImageUpload> {
    ImageUpload::from_path(path, policy)
        .await
        .with_context(|| format!("Cannot use image {}", path.display()))
}

async fn login(config: &Config, name: Option<String>, email: Option<String>) -> Result<()> {
    let (store, mut session) = session(config).await?;
    session.login(User { name, email });
    store.save(&session).await?;
    println!("Logged in as {}", session.greeting());
    Ok(())
}

async fn logout(config: &Config) -> Result<()> {
    let store = SessionStore::from_config(&config.session)?;
    store.clear().await?;
    println!("Logged out");
    Ok(())
}

async fn whoami(config: &Config) -> Result<()> {
    let (_, session) = session(config).await?;
    println!("{}", session.profile_summary());
    Ok(())
}

async fn dashboard(config: &Config) -> Result<()> {
    let (_, session) = session(config).await?;
    println!("{}", session.greeting());
    if !session.is_authenticated() {
        println!("Not signed in; run `kerala-admin login --name NAME` to personalise this");
    }
    println!();
    println!("Dashboard Overview");
    println!("Welcome to the Kerala Travel Admin Panel.");
    println!();
    println!("  about    Edit the About section and its cards");
    println!("  banner   Upload banner slides");
    println!("  gallery  Manage gallery blocks");
    println!("  tours    Browse tour packages and book them");
    println!();
    println!("Backend: {}", config.api.base_url);
    Ok(())
}

async fn about(config: &Config, action: AboutCommands) -> Result<()> {
    let editor = AboutEditor::new(backend(config)?, UploadPolicy::standard(&config.uploads));
    if let Err(err) = editor.load().await {
        if let LoadState::Failed(message) = editor.load_state() {
            eprintln!("{message}");
        }
        return Err(err.into());
    }

    match action {
        AboutCommands::Show => {
            print_about(&editor);
            Ok(())
        }
        AboutCommands::Edit {
            heading,
            paragraph,
            background,
            card_titles,
            card_images,
        } => {
            edit_about(&editor, heading, paragraph, background, card_titles, card_images).await?;
            let result = editor.submit().await;
            report(result, editor.take_notice())
        }
        AboutCommands::AddCard { title, image } => {
            let image = read_image(&image, editor.policy()).await?;
            let result = editor.add_card(&title, image).await;
            report(result, editor.take_notice())
        }
        AboutCommands::DeleteCard { index, yes } => {
            let result = editor.delete_card(index, confirmer(yes)).await;
            report_outcome(result, editor.take_notice())
        }
    }
}

async fn edit_about(
    editor: &AboutEditor<ApiClient>,
    heading: Option<String>,
    paragraph: Option<String>,
    background: Option<PathBuf>,
    card_titles: Vec<(usize, String)>,
    card_images: Vec<(usize, PathBuf)>,
) -> Result<()> {
    if let Some(heading) = heading {
        editor.set_heading(heading)?;
    }
    if let Some(paragraph) = paragraph {
        editor.set_paragraph(paragraph)?;
    }
    if let Some(path) = background {
        editor.select_background(read_image(&path, editor.policy()).await?)?;
    }
    for (index, title) in card_titles {
        editor.set_card_title(index, title)?;
    }
    for (index, path) in card_images {
        editor.select_card_image(index, read_image(&path, editor.policy()).await?)?;
    }
    Ok(())
}

fn print_about(editor: &AboutEditor<ApiClient>) {
    let Some(draft) = editor.draft() else {
        return;
    };
    let base_url = editor.base_url();

    println!("{}", draft.heading);
    println!();
    println!("{}", draft.paragraph);
    if let Some(url) = draft.background.preview(base_url) {
        println!();
        println!("Background: {url}");
    }
    for (index, card) in draft.cards.iter().enumerate() {
        let image = card.image.preview(base_url).unwrap_or_else(|| "-".to_string());
        println!("[{index}] {}  {image}", card.title);
    }
}

/// Pair `--slide` arguments with carousel slots, in order
fn assign_slots(slides: Vec<SlideArg>) -> Result<Vec<(BannerSlot, SlideArg)>> {
    if slides.len() > usize::from(BannerSlot::COUNT) {
        bail!("At most {} slides can be uploaded", BannerSlot::COUNT);
    }
    Ok(BannerSlot::all().zip(slides).collect())
}

async fn banner(config: &Config, action: BannerCommands) -> Result<()> {
    let BannerCommands::Upload { slides } = action;
    let slides = assign_slots(slides)?;

    let editor = BannerEditor::new(backend(config)?, UploadPolicy::banner(&config.uploads));
    for (slot, SlideArg { heading, subheading, image }) in slides {
        editor.set_heading(slot, heading);
        editor.set_subheading(slot, subheading);
        let upload = read_image(&image, editor.policy()).await?;
        editor.select_image(slot, upload)?;
    }

    let result = editor.submit().await;
    report(result, editor.take_notice())
}

async fn gallery(config: &Config, action: GalleryCommands) -> Result<()> {
    let editor = GalleryEditor::new(backend(config)?, UploadPolicy::standard(&config.uploads));
    if let Err(err) = editor.load().await {
        if let LoadState::Failed(message) = editor.load_state() {
            eprintln!("{message}");
        }
        return Err(err.into());
    }

    match action {
        GalleryCommands::List => {
            for card in editor.cards() {
                let image = card.image.unwrap_or_else(|| "-".to_string());
                println!("{:<8} {:<30} {image}", card.block.as_str(), card.title);
            }
            Ok(())
        }
        GalleryCommands::Update {
            block,
            title,
            image,
        } => update_block(&editor, block, title, image).await,
        GalleryCommands::Delete { block, yes } => {
            let result = editor.delete(&block, confirmer(yes)).await;
            report_outcome(result, editor.take_notice())
        }
    }
}

async fn update_block(
    editor: &GalleryEditor<ApiClient>,
    block: BlockId,
    title: Option<String>,
    image: Option<PathBuf>,
) -> Result<()> {
    let image = match image {
        Some(path) => Some(read_image(&path, editor.policy()).await?),
        None => None,
    };

    if editor.draft(&block).is_none() {
        let Some(title) = title else {
            bail!("{block} does not exist yet; pass --title to create it");
        };
        let result = editor.add_block(block, &title, image).await;
        return report(result, editor.take_notice());
    }

    if title.is_none() && image.is_none() {
        warn!(%block, "Nothing to change");
    }
    if let Some(title) = title {
        editor.set_title(&block, title)?;
    }
    if let Some(image) = image {
        editor.select_image(&block, image)?;
    }

    let result = editor.update(&block).await;
    report(result, editor.take_notice())
}

async fn tours(config: &Config, action: TourCommands) -> Result<()> {
    let backend = backend(config)?;
    let view = ToursView::new(Arc::clone(&backend));
    if let Err(err) = view.load().await {
        if let LoadState::Failed(message) = view.load_state() {
            eprintln!("{message}");
        }
        return Err(err.into());
    }

    match action {
        TourCommands::List => {
            for card in view.cards() {
                println!("{}  ({})", card.title, card.price);
                if !card.description.is_empty() {
                    println!("    {}", card.description);
                }
                if let Some(image) = card.image {
                    println!("    {image}");
                }
            }
            Ok(())
        }
        TourCommands::Book {
            package,
            name,
            phone,
            date,
            people,
        } => {
            let Some(selected) = view.find(&package) else {
                bail!("No tour package named '{package}'");
            };

            let flow = BookingFlow::new(backend);
            flow.open(selected)?;
            flow.set_name(name)?;
            flow.set_phone(phone)?;
            flow.set_date(date)?;
            flow.set_people(people)?;

            let result = flow.submit().await;
            report(result, flow.take_notice())
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    if shown.api.api_key.is_some() {
        shown.api.api_key = Some("********".to_string());
    }

    let config_toml =
        toml::to_string_pretty(&shown).context("Failed to serialize configuration")?;
    println!("{config_toml}");
    Ok(())
}
