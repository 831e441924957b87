use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use dotenvy::dotenv;
use jifunze_cli::admin;
use jifunze_cli::seeder::{self, CoursesPerSchool, SeedConfig, UsersPerSchool};
use jifunze_config::DatabaseConfig;
use jifunze_db::{PgPool, init_db_pool, run_migrations};

#[derive(Parser)]
#[command(name = "jifunze-cli")]
#[command(about = "Jifunze CLI - Administrative tools for Jifunze", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a manager account
    CreateManager {
        /// Display name of the manager
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with fake schools, users, courses and enrollments
    Seed {
        /// Number of schools to create, each with its own manager
        #[arg(short = 's', long, default_value = "3")]
        schools: usize,

        /// Number of educators per school
        #[arg(long, default_value = "4")]
        educators: usize,

        /// Number of students per school
        #[arg(long, default_value = "30")]
        students: usize,

        /// Number of courses per school
        #[arg(long, default_value = "6")]
        courses: usize,

        /// Number of courses each student is enrolled in
        #[arg(long, default_value = "3")]
        enrollments: usize,
    },
    /// Remove all seeded data (accounts outside the seed domain are kept)
    ClearSeed {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Delete password reset tokens past their expiry
    PurgeResetTokens,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("\n❌ {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_config = DatabaseConfig::from_env();
    let pool = init_db_pool(&db_config)
        .await
        .context("Failed to connect to database")?;
    if db_config.run_migrations {
        run_migrations(&pool).await?;
    }

    match cli.command {
        Commands::CreateManager {
            name,
            email,
            password,
        } => handle_create_manager(&pool, name, email, password).await,
        Commands::Seed {
            schools,
            educators,
            students,
            courses,
            enrollments,
        } => {
            let config = SeedConfig::new(schools)
                .with_users(UsersPerSchool {
                    educators,
                    students,
                })
                .with_courses(CoursesPerSchool {
                    count: courses,
                    enrollments_per_student: enrollments,
                });
            seeder::seed_all(&pool, config).await.map(|_| ())
        }
        Commands::ClearSeed { yes } => handle_clear_seed(&pool, yes).await,
        Commands::PurgeResetTokens => {
            let purged = admin::purge_reset_tokens(&pool).await?;
            println!("✅ Purged {purged} expired reset tokens");
            Ok(())
        }
    }
}

async fn handle_create_manager(
    pool: &PgPool,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let name = match name {
        Some(name) => name,
        None => Input::new().with_prompt("Name").interact_text()?,
    };

    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Email address").interact_text()?,
    };

    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()?,
    };

    let public_id = admin::create_manager(pool, &name, &email, &password).await?;

    println!("\n✅ Manager created successfully!");
    println!("   Id: {public_id}");
    println!("   Email: {}", email.trim().to_lowercase());
    println!("   Name: {}", name.trim());
    Ok(())
}

async fn handle_clear_seed(pool: &PgPool, yes: bool) -> anyhow::Result<()> {
    let confirmed = yes
        || Confirm::new()
            .with_prompt("Delete all seeded schools, users and course data?")
            .default(false)
            .interact()?;

    if !confirmed {
        println!("Aborted");
        return Ok(());
    }

    seeder::clear_seed(pool).await
}
