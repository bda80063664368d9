use clap::{Args, Subcommand};
use hn_core::Result;
use crate::pipeline::IngestPipeline;

#[derive(Args, Debug, Clone)]
pub struct ScraperArgs {
    #[command(subcommand)]
    pub command: ScraperCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Scrape listing pages and store their articles
    Ingest {
        /// Number of listing pages to scrape
        #[arg(short = 'n', long, default_value_t = 1)]
        pages: usize,
        /// Listing page to start from instead of the configured start URL
        #[arg(long)]
        from: Option<String>,
    },
    /// Find stored articles whose description mentions a keyword
    Search {
        keyword: String,
    },
    /// List stored articles
    List,
    /// Show one article with its generalized description and word counts
    Show {
        id: i64,
    },
}

pub async fn handle_command(args: ScraperArgs, pipeline: &IngestPipeline) -> Result<()> {
    match args.command {
        ScraperCommands::Ingest { pages, from } => {
            let result = match from {
                Some(url) => pipeline.ingest(&url, pages).await?,
                None => pipeline.ingest_latest(pages).await?,
            };
            println!(
                "🆕 {} web scraping entries created from {} pages",
                result.count, result.pages
            );
        }
        ScraperCommands::Search { keyword } => {
            for link in pipeline.search(&keyword).await? {
                println!("{}", link.url);
            }
        }
        ScraperCommands::List => {
            for article in pipeline.list().await? {
                println!("{:>5}  {} - {}", article.id, article.titles, article.url);
            }
        }
        ScraperCommands::Show { id } => {
            let detail = pipeline.article(id).await?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: ScraperCommands,
    }

    #[test]
    fn test_parse_ingest() {
        let cli = TestCli::try_parse_from(["test", "ingest", "-n", "3"]).unwrap();
        match cli.command {
            ScraperCommands::Ingest { pages, from } => {
                assert_eq!(pages, 3);
                assert!(from.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_requires_keyword() {
        assert!(TestCli::try_parse_from(["test", "search"]).is_err());
        let cli = TestCli::try_parse_from(["test", "search", "kubernetes"]).unwrap();
        assert!(matches!(cli.command, ScraperCommands::Search { keyword } if keyword == "kubernetes"));
    }
}
