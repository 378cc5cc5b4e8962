/// Forge: command-line front end for the generators.
///
/// Usage: forge <command> [options] [--settings <path>] [--seed <n>]
///
/// Commands:
///   npc       [--level <n>] [--race <name>] [--class <name>] [--subclass <name>]
///             [--alignment <name>] [--json]
///   dungeon   [--type <name>] [--size small|medium|large] [--svg <file>] [--json]
///   template  <name> [--count <n>] [--depth <n>]
///   templates                 list template names
///   export    <npc|dungeon|random>
///
/// Logging follows RUST_LOG (e.g. RUST_LOG=tabletop_gen=debug).

use std::process;
use tabletop_gen::core::character::CharacterOptions;
use tabletop_gen::core::dungeon::DungeonOptions;
use tabletop_gen::core::toolkit::{TemplateOptions, Toolkit, ToolkitError};
use tabletop_gen::schema::dungeon::DungeonSize;
use tabletop_gen::schema::npc::Alignment;
use tabletop_gen::schema::settings::Section;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let command = args[1].clone();
    let mut positional: Vec<String> = Vec::new();
    let mut options: Vec<(String, Option<String>)> = Vec::new();

    let mut i = 2;
    while i < args.len() {
        let arg = &args[i];
        if let Some(flag) = arg.strip_prefix("--") {
            let takes_value = !matches!(flag, "json");
            if takes_value && i + 1 < args.len() {
                i += 1;
                options.push((flag.to_string(), Some(args[i].clone())));
            } else if takes_value {
                eprintln!("Missing value for --{}", flag);
                process::exit(2);
            } else {
                options.push((flag.to_string(), None));
            }
        } else {
            positional.push(arg.clone());
        }
        i += 1;
    }

    let value = |name: &str| -> Option<String> {
        options
            .iter()
            .find(|(flag, _)| flag == name)
            .and_then(|(_, v)| v.clone())
    };
    let has = |name: &str| options.iter().any(|(flag, _)| flag == name);

    let mut builder = Toolkit::builder();
    if let Some(seed) = value("seed") {
        match seed.parse() {
            Ok(seed) => builder = builder.seed(seed),
            Err(_) => fail(&format!("Invalid seed: {}", seed)),
        }
    }
    if let Some(path) = value("settings") {
        builder = builder.settings_path(path);
    }
    let mut toolkit = match builder.build() {
        Ok(toolkit) => toolkit,
        Err(e) => fail(&format!("Failed to load settings: {}", e)),
    };
    if value("seed").is_none() {
        eprintln!("Seed: {} (pass --seed {} to replay)", toolkit.seed(), toolkit.seed());
    }

    let result = match command.as_str() {
        "npc" => run_npc(&mut toolkit, &value, has("json")),
        "dungeon" => run_dungeon(&mut toolkit, &value, has("json")),
        "template" => match positional.first() {
            Some(name) => run_template(&mut toolkit, name, &value),
            None => fail("Usage: forge template <name> [--count <n>] [--depth <n>]"),
        },
        "templates" => {
            for generator in &toolkit.settings().random.generators {
                println!("{}", generator.name);
            }
            Ok(())
        }
        "export" => {
            let section = positional.first().map(String::as_str).unwrap_or("");
            match section.parse::<Section>() {
                Ok(section) => toolkit
                    .settings()
                    .export_section(section)
                    .map(|json| println!("{}", json))
                    .map_err(ToolkitError::from),
                Err(e) => fail(&e.to_string()),
            }
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            process::exit(2);
        }
    };

    if let Err(e) = result {
        fail(&e.to_string());
    }
}

fn run_npc(
    toolkit: &mut Toolkit,
    value: &dyn Fn(&str) -> Option<String>,
    json: bool,
) -> Result<(), ToolkitError> {
    let level = value("level").map(|l| match l.parse() {
        Ok(level) => level,
        Err(_) => fail(&format!("Invalid level: {}", l)),
    });
    let alignment = value("alignment").map(|a| match parse_alignment(&a) {
        Some(alignment) => alignment,
        None => fail(&format!("Unknown alignment: {}", a)),
    });
    let options = CharacterOptions {
        level,
        race: value("race"),
        class: value("class"),
        subclass: value("subclass"),
        alignment,
    };

    let npc = toolkit.generate_character(&options)?;
    if json {
        match serde_json::to_string_pretty(&npc) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(&e.to_string()),
        }
    } else {
        println!("{}", toolkit.format_statblock(&npc)?);
    }
    Ok(())
}

fn run_dungeon(
    toolkit: &mut Toolkit,
    value: &dyn Fn(&str) -> Option<String>,
    json: bool,
) -> Result<(), ToolkitError> {
    let size = match value("size") {
        Some(s) => match parse_size(&s) {
            Some(size) => size,
            None => fail(&format!("Unknown size: {}", s)),
        },
        None => DungeonSize::default(),
    };
    let options = DungeonOptions {
        dungeon_type: value("type"),
        size,
    };

    let dungeon = toolkit.generate_dungeon(&options)?;
    if let Some(path) = value("svg") {
        if let Err(e) = std::fs::write(&path, &dungeon.svg) {
            fail(&format!("Failed to write {}: {}", path, e));
        }
        eprintln!("Map written to {}", path);
    }
    if json {
        match serde_json::to_string_pretty(&dungeon) {
            Ok(text) => println!("{}", text),
            Err(e) => fail(&e.to_string()),
        }
    } else {
        println!("{}", dungeon.guide);
    }
    Ok(())
}

fn run_template(
    toolkit: &mut Toolkit,
    name: &str,
    value: &dyn Fn(&str) -> Option<String>,
) -> Result<(), ToolkitError> {
    let count: usize = value("count").and_then(|c| c.parse().ok()).unwrap_or(1);
    let options = TemplateOptions {
        max_depth: value("depth").and_then(|d| d.parse().ok()),
    };
    for _ in 0..count {
        let expansion = toolkit.expand_template(name, &options)?;
        println!("{}", expansion.text);
        for issue in &expansion.issues {
            eprintln!("  warning: {:?}", issue);
        }
    }
    Ok(())
}

fn parse_alignment(input: &str) -> Option<Alignment> {
    Alignment::ALL
        .into_iter()
        .find(|a| a.name().eq_ignore_ascii_case(input.trim()))
}

fn parse_size(input: &str) -> Option<DungeonSize> {
    DungeonSize::ALL
        .into_iter()
        .find(|s| s.to_string().eq_ignore_ascii_case(input.trim()))
}

fn fail(message: &str) -> ! {
    eprintln!("ERROR: {}", message);
    process::exit(1);
}

fn print_usage() {
    println!("Usage: forge <command> [options] [--settings <path>] [--seed <n>]");
    println!();
    println!("Commands:");
    println!("  npc       [--level <n>] [--race <name>] [--class <name>] [--subclass <name>]");
    println!("            [--alignment <name>] [--json]");
    println!("  dungeon   [--type <name>] [--size small|medium|large] [--svg <file>] [--json]");
    println!("  template  <name> [--count <n>] [--depth <n>]");
    println!("  templates");
    println!("  export    <npc|dungeon|random>");
}
