/// Template linter: checks random text templates for broken references.
///
/// Usage: template_linter [settings.json] [--strict]
///
/// Without a path the built-in templates are checked. `--strict` turns
/// warnings into a failing exit code.

use std::path::Path;
use std::process;
use tabletop_gen::schema::settings::Settings;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut settings_path = None;
    let mut strict = false;

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("Usage: template_linter [settings.json] [--strict]");
                process::exit(0);
            }
            "--strict" => strict = true,
            path if settings_path.is_none() => settings_path = Some(path.to_string()),
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(2);
            }
        }
    }

    let loaded = match settings_path {
        Some(ref path) => Settings::load_json(Path::new(path)),
        None => Settings::builtin(),
    };
    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ERROR: Failed to load settings: {}", e);
            process::exit(1);
        }
    };

    let generators = &settings.random.generators;
    println!("Loaded {} templates", generators.len());
    println!("\n=== Template Lint Report ===\n");

    let mut errors = 0;
    let mut warnings = 0;
    for generator in generators {
        for issue in generator.lint() {
            if issue.is_error() {
                errors += 1;
                println!("ERROR [{}]: {}", generator.name, issue);
            } else {
                warnings += 1;
                println!("WARNING [{}]: {}", generator.name, issue);
            }
        }
    }

    if errors == 0 && warnings == 0 {
        println!("All checks passed!");
    }
    println!("\nSummary: {} errors, {} warnings", errors, warnings);

    if errors > 0 || (strict && warnings > 0) {
        process::exit(1);
    }
}
