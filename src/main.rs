use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use safelist::arena_dom::Document;
use safelist::config::file::PolicyFile;
use safelist::{Cleaner, Policy, Preset};

/// Sanitizes HTML read from stdin against an allow-list policy.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Built-in policy to start from. Ignored when the policy file names its own preset.
    #[arg(long, value_enum, default_value = "basic")]
    preset: Preset,

    /// JSON policy file applied on top of the preset.
    #[arg(long)]
    policy_file: Option<PathBuf>,

    /// Base URI relative links are resolved against.
    #[arg(long)]
    base_uri: Option<String>,

    /// Keep relative links as they are.
    #[arg(long)]
    preserve_relative_links: bool,

    /// Treat the input as a complete document instead of body content.
    #[arg(long)]
    document: bool,

    /// Report whether the input already conforms instead of cleaning it. Exits with status 1 when
    /// it does not.
    #[arg(long)]
    validate: bool,
}

fn load_policy(args: &Args) -> Result<Policy> {
    let mut policy = match args.policy_file {
        Some(ref path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read policy file {}", path.display()))?;
            let mut file = PolicyFile::from_json(&json)?;
            file.preset.get_or_insert(args.preset);
            file.into_policy()?
        }
        None => args.preset.policy(),
    };
    if args.preserve_relative_links {
        policy.preserve_relative_links(true);
    }
    Ok(policy)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let policy = load_policy(&args)?;
    let cleaner = Cleaner::new(&policy);

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read html from stdin")?;

    if args.validate {
        let valid = if args.document {
            let arena = typed_arena::Arena::new();
            let dirty = Document::parse(&arena, &input, args.base_uri.as_deref());
            cleaner.is_valid(&dirty)?
        } else {
            cleaner.is_valid_body_html(&input)
        };
        println!("{}", if valid { "valid" } else { "invalid" });
        if !valid {
            process::exit(1);
        }
        return Ok(());
    }

    let output = if args.document {
        let arena = typed_arena::Arena::new();
        let dirty = Document::parse(&arena, &input, args.base_uri.as_deref());
        let clean_arena = typed_arena::Arena::new();
        let clean = cleaner.clean(&clean_arena, &dirty);
        clean.to_html()?
    } else {
        cleaner.clean_body_html(&input, args.base_uri.as_deref())?
    };
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
