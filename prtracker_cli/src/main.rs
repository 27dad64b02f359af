use clap::{Args, Parser, Subcommand};
use prtracker_core::history::{self, format_duration};
use prtracker_core::session::SessionSnapshot;
use prtracker_core::timer::Ticker;
use prtracker_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prtracker")]
#[command(about = "Strength workout tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Args)]
struct Credentials {
    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Check credentials
    Login {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Manage workout templates
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Run a workout session, reading commands from stdin
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Show completed workouts
    History {
        #[command(flatten)]
        credentials: Credentials,

        /// Show the sets of one session
        #[arg(long)]
        show: Option<SessionId>,
    },

    /// Body weight log
    Weight {
        #[command(subcommand)]
        action: WeightAction,
    },

    /// Export completed workouts to CSV
    Export {
        #[command(flatten)]
        credentials: Credentials,

        /// Destination file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum TemplateAction {
    /// Compose and save a template
    Create {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(long)]
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Name[:sets[:weight[:reps[:rest]]]], repeatable
        #[arg(long = "exercise")]
        exercises: Vec<String>,
    },

    /// List your templates
    List {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Show a template's exercises
    Show {
        #[command(flatten)]
        credentials: Credentials,

        id: TemplateId,
    },

    /// Delete a template
    Delete {
        #[command(flatten)]
        credentials: Credentials,

        id: TemplateId,
    },
}

impl TemplateAction {
    fn credentials(&self) -> &Credentials {
        match self {
            TemplateAction::Create { credentials, .. }
            | TemplateAction::List { credentials }
            | TemplateAction::Show { credentials, .. }
            | TemplateAction::Delete { credentials, .. } => credentials,
        }
    }
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start a session, optionally from a template
    Start {
        #[command(flatten)]
        credentials: Credentials,

        #[arg(long)]
        template: Option<TemplateId>,
    },
}

#[derive(Subcommand)]
enum WeightAction {
    /// Record today's body weight in kg
    Log {
        #[command(flatten)]
        credentials: Credentials,

        kg: f64,
    },

    /// List recorded body weights, newest first
    List {
        #[command(flatten)]
        credentials: Credentials,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    prtracker_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    let db = Database::open(&config.data.database_path())?;
    let report = ensure_schema(&db)?;
    for (step, error) in &report.failed {
        eprintln!("warning: migration {} failed: {}", step, error);
    }

    match cli.command {
        Commands::Signup { name, credentials } => cmd_signup(&db, &name, &credentials),
        Commands::Login { credentials } => {
            let user = authenticate(&db, &credentials)?;
            println!("✓ Logged in as {}", user.name);
            Ok(())
        }
        Commands::Template { action } => {
            let user = authenticate(&db, action.credentials())?;
            cmd_template(&db, &config, &user, action)
        }
        Commands::Session {
            action:
                SessionAction::Start {
                    credentials,
                    template,
                },
        } => {
            let user = authenticate(&db, &credentials)?;
            cmd_session(&db, &config, &user, template)
        }
        Commands::History { credentials, show } => {
            let user = authenticate(&db, &credentials)?;
            match show {
                Some(id) => cmd_history_show(&db, &user, id),
                None => cmd_history(&db, &user),
            }
        }
        Commands::Weight { action } => {
            let credentials = match &action {
                WeightAction::Log { credentials, .. } | WeightAction::List { credentials } => {
                    credentials
                }
            };
            let user = authenticate(&db, credentials)?;
            cmd_weight(&db, &user, action)
        }
        Commands::Export { credentials, path } => {
            let user = authenticate(&db, &credentials)?;
            let rows = prtracker_core::export::sessions_to_csv(&db, user.id, &path)?;
            println!("✓ Exported {} sets to {}", rows, path.display());
            Ok(())
        }
    }
}

fn authenticate(db: &Database, credentials: &Credentials) -> Result<User> {
    db.users()
        .login(&credentials.email, &credentials.password)?
        .ok_or_else(|| Error::Validation("Invalid email or password".into()))
}

fn cmd_signup(db: &Database, name: &str, credentials: &Credentials) -> Result<()> {
    let name = name.trim();
    let email = credentials.email.trim();
    if name.is_empty() || email.is_empty() || credentials.password.is_empty() {
        return Err(Error::Validation(
            "Name, email and password are all required".into(),
        ));
    }
    if db.users().get_by_email(email)?.is_some() {
        return Err(Error::Validation(format!("{} is already registered", email)));
    }

    let id = db.users().create(name, email, &credentials.password)?;
    println!("✓ Account created for {} (id {})", name, id);
    Ok(())
}

// ============================================================================
// Templates
// ============================================================================

fn cmd_template(db: &Database, config: &Config, user: &User, action: TemplateAction) -> Result<()> {
    match action {
        TemplateAction::Create {
            name,
            description,
            exercises,
            ..
        } => {
            let mut composer = TemplateComposer::new(db)
                .with_default_sets(config.session.default_template_sets);
            composer.set_name(&name);
            composer.set_description(description.as_deref());
            for spec in &exercises {
                apply_exercise_spec(&mut composer, spec)?;
            }
            let id = composer.save(user.id)?;
            println!(
                "✓ Template '{}' saved (id {}, {} exercises)",
                name.trim(),
                id,
                composer.exercises().len()
            );
            Ok(())
        }

        TemplateAction::List { .. } => {
            let templates = db.templates().list_for_user(user.id)?;
            if templates.is_empty() {
                println!("No templates yet.");
            }
            for template in templates {
                let count = db.templates().exercise_count(template.id)?;
                println!("{:>4}  {}  ({} exercises)", template.id, template.name, count);
            }
            Ok(())
        }

        TemplateAction::Show { id, .. } => {
            let template = owned_template(db, user, id)?;
            println!("{}", template.name);
            if let Some(description) = &template.description {
                println!("  {}", description);
            }
            for slot in db.templates().exercises(id)? {
                let p = &slot.prescription;
                println!(
                    "  {}. {}  {} sets{}{}  rest {}s",
                    slot.order_index,
                    slot.exercise_name,
                    p.sets,
                    p.weight.map(|w| format!(" @ {}kg", w)).unwrap_or_default(),
                    p.reps.map(|r| format!(" x {}", r)).unwrap_or_default(),
                    slot.rest_timer
                );
            }
            Ok(())
        }

        TemplateAction::Delete { id, .. } => {
            let template = owned_template(db, user, id)?;
            db.templates().delete(id)?;
            println!("✓ Deleted template '{}'", template.name);
            Ok(())
        }
    }
}

fn owned_template(db: &Database, user: &User, id: TemplateId) -> Result<Template> {
    db.templates()
        .get(id)?
        .filter(|t| t.user_id == user.id)
        .ok_or_else(|| Error::NotFound(format!("template {}", id)))
}

/// Apply `Name[:sets[:weight[:reps[:rest]]]]`; empty fields keep defaults
fn apply_exercise_spec(composer: &mut TemplateComposer<'_>, spec: &str) -> Result<()> {
    let mut parts = spec.split(':').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let index = composer.add_exercise(name)?;

    if let Some(sets) = parts.next().filter(|s| !s.is_empty()) {
        composer.set_target_sets(index, parse_number(spec, sets)?)?;
    }
    if let Some(weight) = parts.next().filter(|s| !s.is_empty()) {
        composer.set_target_weight(index, Some(parse_number(spec, weight)?))?;
    }
    if let Some(reps) = parts.next().filter(|s| !s.is_empty()) {
        composer.set_target_reps(index, Some(parse_number(spec, reps)?))?;
    }
    if let Some(rest) = parts.next() {
        composer.set_rest_timer(index, rest)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(spec: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Validation(format!("Invalid value {:?} in {:?}", value, spec)))
}

// ============================================================================
// Session
// ============================================================================

fn cmd_session(
    db: &Database,
    config: &Config,
    user: &User,
    template: Option<TemplateId>,
) -> Result<()> {
    if let Some(id) = template {
        owned_template(db, user, id)?;
    }

    let mut engine = SessionEngine::start(db, user.id, template, (&config.session).into())?;
    let mut ticker = Ticker::new();
    println!("Session {} started", engine.session_id());
    print_snapshot(&engine.snapshot());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        engine.advance(ticker.take());

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // A failed command leaves the session open so it can be retried
        if let Err(e) = run_session_command(&mut engine, line) {
            if matches!(e, Error::Storage(_) | Error::Io(_)) {
                tracing::error!("Session {}: {:?} failed: {}", engine.session_id(), line, e);
            }
            eprintln!("error: {}", e);
        }

        if engine.state().is_terminal() {
            return Ok(());
        }
        io::stdout().flush()?;
    }

    // Input closed without finish
    engine.abandon()?;
    println!("Session {} abandoned", engine.session_id());
    Ok(())
}

fn run_session_command(engine: &mut SessionEngine<'_>, line: &str) -> Result<()> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();

    match command.to_lowercase().as_str() {
        "add" => {
            let index = engine.add_exercise(rest)?;
            println!("Added {} as exercise {}", engine.exercises()[index].name, index + 1);
        }
        "set" => {
            let exercise = position(args.first())?;
            let set = engine.add_set(exercise)?;
            println!("Added set {} to {}", set + 1, engine.exercises()[exercise].name);
        }
        "edit" => {
            if args.len() < 3 {
                return Err(Error::Validation("usage: edit EX SET FIELD [VALUE]".into()));
            }
            let (exercise, set) = (position(args.first())?, position(args.get(1))?);
            let field = SetField::parse(args[2], &args[3..].join(" "))?;
            if !engine.set_field(exercise, set, field)? {
                println!("Set {} is completed; undo it to edit", set + 1);
            }
        }
        "done" => {
            let (exercise, set) = (position(args.first())?, position(args.get(1))?);
            engine.complete_set(exercise, set)?;
            let entry = &engine.exercises()[exercise];
            print!("✓ {} set {}", entry.name, entry.sets[set].label());
            match engine.rest() {
                Some(rest) => println!("  rest {}s", rest.remaining),
                None => println!(),
            }
        }
        "undo" => {
            let (exercise, set) = (position(args.first())?, position(args.get(1))?);
            if !engine.uncomplete_set(exercise, set)? {
                println!("Set {} was not completed", set + 1);
            }
        }
        "delete" => {
            let (exercise, set) = (position(args.first())?, position(args.get(1))?);
            engine.delete_set(exercise, set)?;
        }
        "status" => print_snapshot(&engine.snapshot()),
        "finish" => {
            engine.finish()?;
            println!(
                "✓ Session {} completed in {}",
                engine.session_id(),
                format_duration(Some(engine.elapsed_seconds()))
            );
        }
        "abandon" => {
            engine.abandon()?;
            println!("Session {} abandoned", engine.session_id());
        }
        other => {
            return Err(Error::Validation(format!("Unknown command: {}", other)));
        }
    }
    Ok(())
}

/// 1-based position typed by the user, as an index
fn position(arg: Option<&&str>) -> Result<usize> {
    arg.and_then(|a| a.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map(|n| n - 1)
        .ok_or_else(|| Error::Validation("Positions are numbers starting at 1".into()))
}

fn print_snapshot(snapshot: &SessionSnapshot) {
    println!("─────────────────────────────────────────");
    println!(
        "Elapsed {}",
        format_duration(Some(snapshot.elapsed_seconds))
    );
    if let Some(rest) = snapshot.rest {
        if let Some(exercise) = snapshot.exercises.get(rest.exercise) {
            println!("Rest {}s ({})", rest.remaining, exercise.name);
        }
    }
    for (index, exercise) in snapshot.exercises.iter().enumerate() {
        println!("{}. {}  (rest {}s)", index + 1, exercise.name, exercise.rest_seconds);
        for entry in &exercise.sets {
            println!(
                "   {:>3}  {} x {}{}",
                entry.label(),
                entry.weight.map(|w| w.to_string()).unwrap_or_else(|| "-".into()),
                entry.reps.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                if entry.is_completed() { "  ✓" } else { "" }
            );
        }
    }
}

// ============================================================================
// History and weight
// ============================================================================

fn cmd_history(db: &Database, user: &User) -> Result<()> {
    let summaries = history::list_completed(db, user.id)?;
    if summaries.is_empty() {
        println!("No completed workouts yet.");
    }
    for summary in summaries {
        println!(
            "{:>4}  {}  {:>6}  {}{} exercises, {} sets",
            summary.session.id,
            summary.session.started_at.format("%Y-%m-%d %H:%M"),
            format_duration(summary.session.duration),
            summary
                .template_name
                .map(|name| format!("{}: ", name))
                .unwrap_or_default(),
            summary.exercise_count,
            summary.set_count
        );
    }
    Ok(())
}

fn cmd_history_show(db: &Database, user: &User, id: SessionId) -> Result<()> {
    let detail = history::get_detail(db, id)?
        .filter(|d| d.session.user_id == user.id)
        .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;

    println!(
        "Session {}  {}  {}",
        detail.session.id,
        detail.session.started_at.format("%Y-%m-%d %H:%M"),
        format_duration(detail.session.duration)
    );
    for group in &detail.exercises {
        println!("{}", group.name);
        for (index, series) in group.sets.iter().enumerate() {
            println!(
                "   {:>3}  {} x {}{}",
                series.kind.label(index + 1),
                series.weight,
                series.reps,
                series.rpe.map(|r| format!("  @{}", r)).unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn cmd_weight(db: &Database, user: &User, action: WeightAction) -> Result<()> {
    match action {
        WeightAction::Log { kg, .. } => {
            if !kg.is_finite() || kg <= 0.0 {
                return Err(Error::Validation(format!("Weight must be positive, got {}", kg)));
            }
            db.weight_logs().record(user.id, chrono::Utc::now(), kg)?;
            println!("✓ Logged {} kg", kg);
        }
        WeightAction::List { .. } => {
            for log in db.weight_logs().list_for_user(user.id)? {
                println!("{}  {} kg", log.logged_at.format("%Y-%m-%d"), log.weight);
            }
        }
    }
    Ok(())
}
