use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "artsaver")]
#[command(author, version, about = "Discord bot that saves image-generation bot output to S3", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Print the resolved configuration with secrets masked, then exit
    CheckConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["artsaver"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["artsaver", "run"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run));
        let cli = Cli::try_parse_from(["artsaver", "check-config"]).unwrap();
        assert_eq!(cli.command, Some(Commands::CheckConfig));
        assert!(Cli::try_parse_from(["artsaver", "dance"]).is_err());
    }
}
