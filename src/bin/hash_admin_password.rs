//! Prints an Argon2 PHC string for `DATABUNDLE_ADMIN_PASSWORD_HASH`.

use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};
use clap::Parser;
use databundle::password::{hash_password, verify_password};

#[derive(Debug, Parser)]
#[command(about = "Hash the admin password for the service configuration")]
struct Args {
    /// Password to hash; read from the first line of stdin when omitted
    #[arg(long)]
    password: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let password = match args.password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("reading password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.chars().count() < 8 {
        bail!("password must be at least 8 characters");
    }

    let hash = hash_password(&password).context("hashing password")?;
    if !verify_password(&password, &hash).context("verifying hash")? {
        bail!("generated hash failed verification");
    }

    println!("{hash}");
    Ok(())
}
