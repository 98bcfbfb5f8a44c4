//! Prompt construction and canned answers.
//!
//! Everything here is pure: the same query and passages always produce the
//! same text. Passage numbering starts at 1 and matches [`Source::rank`], so
//! the `[S<i>]` citations a model emits resolve against the response.
//!
//! [`Source::rank`]: crate::message::Source::rank

use std::fmt::Write as _;

use crate::passage::Passage;

/// Answer substituted when the model returns nothing usable.
pub const UNSURE_ANSWER: &str =
  "I am unsure. The retrieved news articles do not contain enough information to answer that.";

/// At most this many titles are listed in a degraded answer.
pub const FALLBACK_SOURCE_LIMIT: usize = 5;

const BUSY_NOTICE: &str = "The language model is busy right now, so I can't write a full answer.";

/// Render the strict-RAG instruction for `query` over `passages`.
pub fn build_prompt(query: &str, passages: &[Passage]) -> String {
  let mut out = String::from(
    "You are a news assistant. Answer the question using ONLY the context \
     provided below. Do not use any outside knowledge.\n\
     If the context is insufficient to answer, say that you are unsure.\n\
     Cite every claim with the bracketed number of the source it came from, \
     for example [S1] or [S2].\n",
  );

  if !passages.is_empty() {
    out.push_str("\nContext:\n");
    for (i, p) in passages.iter().enumerate() {
      // Writing into a String cannot fail.
      let _ = write!(
        out,
        "\nSource {} ({})\n{}\nURL: {}\n",
        i + 1,
        p.title,
        p.chunk.trim(),
        p.url,
      );
    }
  }

  let _ = write!(out, "\nQuestion: {}\nAnswer:", query.trim());
  out
}

/// The degraded answer returned when generation is unavailable: a notice
/// followed by the leading source titles with their citation numbers.
pub fn fallback_answer(passages: &[Passage]) -> String {
  if passages.is_empty() {
    return format!("{BUSY_NOTICE} I also couldn't find any related articles.");
  }

  let mut out =
    format!("{BUSY_NOTICE} Here are the most relevant sources I found:\n");
  for (i, p) in passages.iter().take(FALLBACK_SOURCE_LIMIT).enumerate() {
    let _ = write!(out, "\n- [S{}] {}", i + 1, p.title);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn passage(n: usize) -> Passage {
    Passage {
      score: 1.0 / n as f32,
      title: format!("Headline {n}"),
      url:   format!("https://news.example/{n}"),
      chunk: format!("Body of article {n}."),
    }
  }

  #[test]
  fn passages_are_numbered_in_order() {
    let prompt = build_prompt("what happened?", &[passage(1), passage(2)]);
    let first = prompt.find("Source 1 (Headline 1)").unwrap();
    let second = prompt.find("Source 2 (Headline 2)").unwrap();
    assert!(first < second);
    assert!(prompt.contains("Body of article 2.\nURL: https://news.example/2"));
  }

  #[test]
  fn prompt_binds_model_to_context_and_citations() {
    let prompt = build_prompt("q", &[passage(1)]);
    assert!(prompt.contains("ONLY the context"));
    assert!(prompt.contains("unsure"));
    assert!(prompt.contains("[S1]"));
    assert!(prompt.ends_with("Question: q\nAnswer:"));
  }

  #[test]
  fn empty_passages_omit_context_section() {
    let prompt = build_prompt("anything new?", &[]);
    assert!(!prompt.contains("Context:"));
    assert!(!prompt.contains("Source 1"));
    assert!(prompt.contains("Question: anything new?"));
  }

  #[test]
  fn build_is_deterministic() {
    let passages = [passage(1), passage(2), passage(3)];
    assert_eq!(build_prompt("q", &passages), build_prompt("q", &passages));
  }

  #[test]
  fn fallback_lists_at_most_five_titles() {
    let passages: Vec<Passage> = (1..=7).map(passage).collect();
    let answer = fallback_answer(&passages);
    assert!(answer.contains("- [S1] Headline 1"));
    assert!(answer.contains("- [S5] Headline 5"));
    assert!(!answer.contains("Headline 6"));
  }

  #[test]
  fn fallback_without_passages_lists_nothing() {
    let answer = fallback_answer(&[]);
    assert!(!answer.is_empty());
    assert!(!answer.contains("[S"));
  }
}
