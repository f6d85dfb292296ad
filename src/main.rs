use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use partchain::config::Direction;
use partchain::{
    Config, Membership, OrderReconstructor, Predicate, RelationLookup, ResourceId, RiSearchClient,
};

#[derive(Parser, Debug)]
#[command(name = "partchain")]
#[command(about = "Reconstruct the order of repository parts from the resource index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the members of a parent in reading order
    Order {
        parent: String,
        #[command(flatten)]
        ordering: OrderingArgs,
        /// Print a JSON array instead of one pid per line
        #[arg(long)]
        json: bool,
    },
    /// Print the member of a parent that follows nothing
    First {
        parent: String,
        #[command(flatten)]
        ordering: OrderingArgs,
    },
    /// Print the member that follows the given one
    Next {
        member: String,
        /// Follows predicate (defaults to config)
        #[arg(long)]
        follows: Option<String>,
    },
    /// List subjects of a predicate
    Subjects {
        predicate: String,
        /// Bound object; omitted means any object
        #[arg(long)]
        object: Option<String>,
    },
    /// List objects of a predicate
    Objects {
        predicate: String,
        /// Bound subject; omitted means any subject
        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Args, Debug)]
struct OrderingArgs {
    /// The parent lists its children instead of each child naming its parent
    #[arg(long)]
    parent_lists_children: bool,
    /// Membership predicate (defaults to config)
    #[arg(long)]
    membership: Option<String>,
    /// Follows predicate (defaults to config)
    #[arg(long)]
    follows: Option<String>,
}

impl OrderingArgs {
    fn resolve(&self, config: &Config) -> Result<(Membership, Predicate)> {
        let predicate = match self.membership {
            Some(ref p) => Predicate::new(p.as_str())?,
            None => config.membership()?.predicate().clone(),
        };
        let direction = if self.parent_lists_children {
            Direction::ParentDeclaresChildren
        } else {
            config.ordering.direction
        };
        let membership = match direction {
            Direction::ChildDeclaresParent => Membership::ChildDeclaresParent(predicate),
            Direction::ParentDeclaresChildren => Membership::ParentDeclaresChildren(predicate),
        };
        Ok((membership, follows_or_default(self.follows.as_deref(), config)?))
    }
}

fn follows_or_default(follows: Option<&str>, config: &Config) -> Result<Predicate> {
    match follows {
        Some(p) => Ok(Predicate::new(p)?),
        None => config.follows(),
    }
}

fn optional_id(raw: Option<&str>) -> Result<Option<ResourceId>> {
    Ok(raw.map(ResourceId::new).transpose()?)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(2);
        }
    };

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.partchain.log_level),
    )
    .init();

    if let Err(e) = run(cli.command, &config).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let client =
        RiSearchClient::new(&config.fedora_url()?, config.credentials()?, config.timeout())?;
    log::debug!("Using resource index at {}", client.endpoint());
    let lookup = RelationLookup::new(&client);

    match command {
        Command::Order {
            parent,
            ordering,
            json,
        } => {
            let parent = ResourceId::new(parent)?;
            let (membership, follows) = ordering.resolve(config)?;
            let chain = OrderReconstructor::new(&client)
                .ordered_parts(&parent, &membership, &follows)
                .await
                .map_err(|e| anyhow::anyhow!("Unable to order parts of {}: {}", parent, e))?;
            log::info!("{} has {} ordered part(s)", parent, chain.len());

            if json {
                println!("{}", serde_json::to_string_pretty(&chain)?);
            } else {
                for pid in &chain {
                    println!("{}", pid);
                }
            }
        }
        Command::First { parent, ordering } => {
            let parent = ResourceId::new(parent)?;
            let (membership, follows) = ordering.resolve(config)?;
            match lookup.find_head(&parent, &membership, &follows).await? {
                Some(head) => println!("{}", head),
                None => log::warn!("No member of {} is declared first", parent),
            }
        }
        Command::Next { member, follows } => {
            let member = ResourceId::new(member)?;
            let follows = follows_or_default(follows.as_deref(), config)?;
            match lookup.find_next(&member, &follows).await? {
                Some(next) => println!("{}", next),
                None => log::info!("Nothing follows {}", member),
            }
        }
        Command::Subjects { predicate, object } => {
            let predicate = Predicate::new(predicate)?;
            let object = optional_id(object.as_deref())?;
            for subject in lookup.subjects_of(object.as_ref(), &predicate).await? {
                println!("{}", subject);
            }
        }
        Command::Objects { predicate, subject } => {
            let predicate = Predicate::new(predicate)?;
            let subject = optional_id(subject.as_deref())?;
            for object in lookup.objects_of(subject.as_ref(), &predicate).await? {
                println!("{}", object);
            }
        }
    }

    Ok(())
}
