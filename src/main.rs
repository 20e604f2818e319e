use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use vsxpub::commands::{self, Config, PublishRequest};

/// vsxpub - VS Code extension publisher
///
/// Package extensions and publish them to the Visual Studio Marketplace.
///
/// Personal Access Tokens are taken from --pat (or VSCE_PAT) when given,
/// otherwise from the credential store filled by `vsxpub login`.
///
/// Examples:
///   vsxpub publish --version patch        # Bump, package and publish
///   vsxpub publish -i tool-1.0.0.vsix     # Publish a prebuilt package
///   vsxpub unpublish --id acme.tool
#[derive(Parser, Debug)]
#[command(author, version = env!("VSXPUB_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Gallery URL (defaults to https://marketplace.visualstudio.com)
    #[arg(
        long = "gallery-url",
        env = "VSXPUB_GALLERY_URL",
        value_name = "URL",
        global = true
    )]
    pub gallery_url: Option<String>,

    /// Credential store file (defaults to ~/.vsce)
    #[arg(long = "store", env = "VSXPUB_STORE", value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Publish an extension
    Publish(PublishArgs),

    /// Package an extension into a .vsix file
    Package(PackageArgs),

    /// List the extensions of a publisher
    List(ListArgs),

    /// Remove an extension from the gallery
    Unpublish(UnpublishArgs),

    /// List known publishers
    LsPublishers,

    /// Store a Personal Access Token for a publisher
    Login(PublisherArgs),

    /// Forget the Personal Access Token of a publisher
    Logout(PublisherArgs),
}

#[derive(clap::Args, Debug)]
pub struct PublishArgs {
    /// Publish this .vsix instead of packaging the current directory
    #[arg(
        long = "package-path",
        short = 'i',
        visible_alias = "packagePath",
        value_name = "PATH"
    )]
    pub package_path: Option<PathBuf>,

    /// Bump before publishing: major, minor, patch or an explicit version
    #[arg(long = "version", value_name = "VERSION")]
    pub bump: Option<String>,

    /// Personal Access Token
    #[arg(long, short = 'p', env = "VSCE_PAT", hide_env_values = true)]
    pub pat: Option<String>,

    #[command(flatten)]
    pub urls: BaseUrlArgs,
}

#[derive(clap::Args, Debug)]
pub struct BaseUrlArgs {
    /// Prepend relative links in README.md with this URL
    #[arg(long = "base-content-url", value_name = "URL")]
    pub base_content_url: Option<String>,

    /// Prepend relative image links in README.md with this URL
    #[arg(long = "base-images-url", value_name = "URL")]
    pub base_images_url: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// Output file (defaults to <name>-<version>.vsix)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub urls: BaseUrlArgs,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(value_name = "PUBLISHER")]
    pub publisher: String,
}

#[derive(clap::Args, Debug)]
pub struct UnpublishArgs {
    /// Extension to remove as "publisher.name" (defaults to the current directory's manifest)
    #[arg(long, value_name = "PUBLISHER.NAME")]
    pub id: Option<String>,

    /// Personal Access Token
    #[arg(long, short = 'p', env = "VSCE_PAT", hide_env_values = true)]
    pub pat: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PublisherArgs {
    #[arg(value_name = "PUBLISHER")]
    pub publisher: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(vsxpub::runtime::RealRuntime, cli.gallery_url, cli.store)?;

    match cli.command {
        Commands::Publish(args) => {
            let request = PublishRequest {
                package_path: args.package_path,
                version: args.bump,
                pat: args.pat,
                base_content_url: args.urls.base_content_url,
                base_images_url: args.urls.base_images_url,
            };
            commands::publish(&config, request).await?
        }
        Commands::Package(args) => {
            commands::package(
                &config,
                args.out,
                args.urls.base_content_url,
                args.urls.base_images_url,
            )
            .await?
        }
        Commands::List(args) => commands::list(&config, &args.publisher).await?,
        Commands::Unpublish(args) => commands::unpublish(&config, args.id, args.pat).await?,
        Commands::LsPublishers => commands::ls_publishers(&config)?,
        Commands::Login(args) => commands::login(&config, &args.publisher)?,
        Commands::Logout(args) => commands::logout(&config, &args.publisher)?,
    }
    Ok(())
}
