use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use spandex::{
    AnnotatedDocument, Collection, ContextSpec, EngineConfig, SearchRequest, SpanIndex, SpanNode,
};

/// Index a JSON-lines corpus in memory and run a term query over it
#[derive(Parser, Debug)]
#[command(name = "spandex")]
#[command(version)]
struct Args {
    /// Engine configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Corpus with one JSON document per line
    corpus: PathBuf,

    /// Term to search for, wrapped in class 1
    #[arg(default_value = "s:der")]
    term: String,

    /// Tokens of context on each side of a match
    #[arg(long, default_value_t = 3)]
    context: u32,
}

fn load_corpus(path: &Path) -> Result<Vec<AnnotatedDocument>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut documents = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document: AnnotatedDocument = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid document", path.display(), number + 1))?;
        documents.push(document);
    }
    Ok(documents)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::default(),
    };
    let field = config
        .index
        .annotated_fields()
        .next()
        .map(|f| f.name.clone())
        .context("configuration declares no annotated field")?;

    let mut index = SpanIndex::create_in_ram(config)?;
    let documents = load_corpus(&args.corpus)?;
    index.add_documents(&documents)?;
    index.commit()?;
    log::info!("Indexed {} documents from {}", documents.len(), args.corpus.display());

    let query = SpanNode::class(SpanNode::term(&field, &args.term), 1);
    let request = SearchRequest::new(query).with_context(ContextSpec::tokens(args.context, args.context));
    let result = index.search(&request).context("search failed")?;

    let all = Collection::new();
    log::info!(
        "{} tokens in {} sentences",
        index.number_of(&all, &field, "tokens")?,
        index.number_of(&all, &field, "sentences")?
    );
    println!("{}", result.to_json_pretty()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_arguments() {
        let args = Args::try_parse_from(["spandex", "corpus.jsonl"]).unwrap();
        assert_eq!(args.corpus, PathBuf::from("corpus.jsonl"));
        assert_eq!(args.term, "s:der");
        assert_eq!(args.context, 3);
        assert!(args.config.is_none());

        let args = Args::try_parse_from([
            "spandex", "--config", "engine.yaml", "corpus.jsonl", "s:Hund", "--context", "5",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("engine.yaml")));
        assert_eq!(args.term, "s:Hund");
        assert_eq!(args.context, 5);

        assert!(Args::try_parse_from(["spandex"]).is_err());
    }
}
