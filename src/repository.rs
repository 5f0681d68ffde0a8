//! Ordered rule collection with whole-file JSON persistence
//!
//! The repository is a plain owned value with no interior locking. Callers
//! that search on another thread hand it a cloned rule.
//!
//! On disk the collection is one JSON document:
//!
//! ```json
//! { "rules": [ { "name": "...", "locked": false,
//!                "match_fragments": [ { "level": 1, "id": 1, "kind": "dominates", "pattern": "NP" } ],
//!                "question_templates": [ { "kind": "dominates", "pattern": "What is {Q1}?" } ],
//!                "answer_templates": [] } ] }
//! ```

use crate::error::RepositoryError;
use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct RulesDocumentRef<'a> {
    rules: &'a [Rule],
}

#[derive(Deserialize)]
struct RulesDocument {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// What `commit_from_scratchpad` did with the candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// No rule had the name; the candidate was appended at this index
    Appended(usize),
    /// The rule at this index was overwritten
    Replaced(usize),
    /// The rule at this index is locked and the overwrite was not confirmed
    Declined(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleRepository {
    rules: Vec<Rule>,
}

impl RuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Append a rule, returning its index
    pub fn add(&mut self, rule: Rule) -> usize {
        self.rules.push(rule);
        self.rules.len() - 1
    }

    /// Append an empty rule named "New Rule"
    pub fn new_rule(&mut self) -> usize {
        self.add(Rule::default())
    }

    fn check_index(&self, index: usize) -> Result<(), RepositoryError> {
        if index < self.rules.len() {
            Ok(())
        } else {
            Err(RepositoryError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            })
        }
    }

    pub fn remove(&mut self, index: usize) -> Result<Rule, RepositoryError> {
        self.check_index(index)?;
        Ok(self.rules.remove(index))
    }

    pub fn get(&self, index: usize) -> Result<&Rule, RepositoryError> {
        self.check_index(index)?;
        Ok(&self.rules[index])
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Rule, RepositoryError> {
        self.check_index(index)?;
        Ok(&mut self.rules[index])
    }

    /// Overwrite the rule at `index`, returning the previous one
    pub fn replace(&mut self, index: usize, rule: Rule) -> Result<Rule, RepositoryError> {
        self.check_index(index)?;
        Ok(std::mem::replace(&mut self.rules[index], rule))
    }

    /// Index of the first rule with exactly this name
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name == name)
    }

    /// Append an unlocked copy named "Copy of <name>", returning its index
    pub fn clone_rule(&mut self, index: usize) -> Result<usize, RepositoryError> {
        let copy = self.get(index)?.duplicate();
        Ok(self.add(copy))
    }

    /// Upsert by name.
    ///
    /// A new name is appended and an unlocked rule is overwritten in place.
    /// A locked rule is only overwritten if `confirm` returns `Some(true)`;
    /// `confirm` is not called otherwise.
    pub fn commit_from_scratchpad(
        &mut self,
        candidate: Rule,
        confirm: impl FnOnce(&Rule) -> Option<bool>,
    ) -> CommitOutcome {
        let Some(index) = self.find_by_name(&candidate.name) else {
            return CommitOutcome::Appended(self.add(candidate));
        };

        if self.rules[index].locked && confirm(&self.rules[index]) != Some(true) {
            tracing::debug!(rule = %candidate.name, "overwrite of locked rule declined");
            return CommitOutcome::Declined(index);
        }
        self.rules[index] = candidate;
        CommitOutcome::Replaced(index)
    }

    /// Serialize the whole collection
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), RepositoryError> {
        serde_json::to_writer_pretty(writer, &RulesDocumentRef { rules: &self.rules })?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RepositoryError> {
        let document: RulesDocument = serde_json::from_reader(reader)?;
        Ok(Self::from_rules(document.rules))
    }

    /// Read a rules file
    pub fn load_all(path: &Path) -> Result<Self, RepositoryError> {
        let file = File::open(path).map_err(|source| io_error(path, source))?;
        let repository = Self::from_reader(BufReader::new(file))?;
        tracing::info!(path = %path.display(), rules = repository.len(), "loaded rules");
        Ok(repository)
    }

    /// Write the whole collection to `path`.
    ///
    /// The document goes to a sibling temporary file first and is renamed
    /// over `path`, so an interrupted save leaves the old file intact.
    /// A failed save removes the temporary file.
    pub fn save_all(&self, path: &Path) -> Result<(), RepositoryError> {
        let temp = temp_sibling(path);
        if let Err(err) = self.write_and_rename(&temp, path) {
            if temp.exists() {
                let _ = fs::remove_file(&temp);
            }
            return Err(err);
        }

        tracing::info!(path = %path.display(), rules = self.len(), "saved rules");
        Ok(())
    }

    fn write_and_rename(&self, temp: &Path, path: &Path) -> Result<(), RepositoryError> {
        let file = File::create(temp).map_err(|source| io_error(temp, source))?;
        let mut writer = BufWriter::new(file);
        self.to_writer(&mut writer)?;
        writer.flush().map_err(|source| io_error(temp, source))?;
        drop(writer);
        fs::rename(temp, path).map_err(|source| io_error(path, source))
    }
}

impl<'a> IntoIterator for &'a RuleRepository {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RepositoryError {
    RepositoryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `dir/rules.json` -> `dir/.rules.json.tmp`
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rules".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{FragmentKind, MatchFragment};
    use crate::rule::Template;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn rule(name: &str, locked: bool) -> Rule {
        let mut rule = Rule::new(name);
        rule.locked = locked;
        rule.match_fragments = vec![
            MatchFragment::new(1, 1, FragmentKind::Dominates, "NP"),
            MatchFragment::new(2, 2, FragmentKind::ImmediatelyDominates, "NN"),
        ];
        rule.question_templates = vec![Template::new("What is {Q2}?")];
        rule.answer_templates = vec![Template::with_kind(FragmentKind::Precedes, "{A1}")];
        rule
    }

    fn replacement(name: &str) -> Rule {
        let mut rule = Rule::new(name);
        rule.match_fragments = vec![MatchFragment::new(1, 1, FragmentKind::Dominates, "VP")];
        rule
    }

    #[test]
    fn test_crud() {
        let mut repo = RuleRepository::new();
        assert!(repo.is_empty());

        assert_eq!(repo.add(rule("a", false)), 0);
        assert_eq!(repo.new_rule(), 1);
        assert_eq!(repo.get(1).unwrap().name, "New Rule");
        assert_eq!(repo.find_by_name("a"), Some(0));
        assert_eq!(repo.find_by_name("A"), None);

        let old = repo.replace(0, replacement("b")).unwrap();
        assert_eq!(old.name, "a");
        assert_eq!(repo.get(0).unwrap().name, "b");

        repo.get_mut(1).unwrap().locked = true;
        assert!(repo.get(1).unwrap().locked);

        assert_eq!(repo.remove(0).unwrap().name, "b");
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.iter().count(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut repo = RuleRepository::from_rules(vec![rule("a", false)]);

        assert!(matches!(
            repo.get(3),
            Err(RepositoryError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(repo.remove(1).is_err());
        assert!(repo.replace(1, rule("b", false)).is_err());
        assert!(repo.clone_rule(1).is_err());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_clone_rule() {
        let mut repo = RuleRepository::from_rules(vec![rule("who", true)]);
        let index = repo.clone_rule(0).unwrap();

        assert_eq!(index, 1);
        let copy = repo.get(1).unwrap();
        assert_eq!(copy.name, "Copy of who");
        assert!(!copy.locked);
        assert_eq!(copy.match_fragments, repo.get(0).unwrap().match_fragments);
        assert!(repo.get(0).unwrap().locked);
    }

    #[test]
    fn test_commit_appends_new_name() {
        let mut repo = RuleRepository::from_rules(vec![rule("a", false)]);
        let outcome = repo.commit_from_scratchpad(rule("b", false), |_| panic!("not locked"));

        assert_eq!(outcome, CommitOutcome::Appended(1));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_commit_replaces_unlocked_in_place() {
        let mut repo = RuleRepository::from_rules(vec![rule("a", false), rule("X", false), rule("c", false)]);
        let called = Cell::new(false);
        let outcome = repo.commit_from_scratchpad(replacement("X"), |_| {
            called.set(true);
            Some(false)
        });

        assert_eq!(outcome, CommitOutcome::Replaced(1));
        assert!(!called.get());
        assert_eq!(repo.len(), 3);
        assert_eq!(repo.get(1).unwrap(), &replacement("X"));
    }

    #[test]
    fn test_commit_locked_needs_confirmation() {
        let original = RuleRepository::from_rules(vec![rule("X", true)]);

        for answer in [Some(false), None] {
            let mut repo = original.clone();
            let outcome = repo.commit_from_scratchpad(replacement("X"), |existing| {
                assert_eq!(existing.name, "X");
                answer
            });
            assert_eq!(outcome, CommitOutcome::Declined(0));
            assert_eq!(repo, original);
        }

        let mut repo = original.clone();
        let outcome = repo.commit_from_scratchpad(replacement("X"), |_| Some(true));
        assert_eq!(outcome, CommitOutcome::Replaced(0));
        assert_eq!(repo.get(0).unwrap(), &replacement("X"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        let mut empty_kind = rule("odd", false);
        empty_kind.match_fragments[0].kind = String::new();
        let repo = RuleRepository::from_rules(vec![rule("a", true), rule("b", false), empty_kind, Rule::new("")]);

        repo.save_all(&path).unwrap();
        let loaded = RuleRepository::load_all(&path).unwrap();

        assert_eq!(loaded, repo);
        assert!(!dir.path().join(".rules.json.tmp").exists());
    }

    #[test]
    fn test_save_overwrites_whole_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");

        RuleRepository::from_rules(vec![rule("a", false), rule("b", false)])
            .save_all(&path)
            .unwrap();
        RuleRepository::from_rules(vec![rule("c", false)]).save_all(&path).unwrap();

        let loaded = RuleRepository::load_all(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get(0).unwrap().name, "c");
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let target = dir.path().join("rules.json");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let repository = RuleRepository::from_rules(vec![rule("a", false)]);
        assert!(matches!(
            repository.save_all(&target),
            Err(RepositoryError::Io { .. })
        ));
        assert!(!dir.path().join(".rules.json.tmp").exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_document_format() {
        let repo = RuleRepository::from_rules(vec![rule("a", true)]);
        let mut buffer = Vec::new();
        repo.to_writer(&mut buffer).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["rules"][0]["name"], "a");
        assert_eq!(value["rules"][0]["locked"], true);
        assert_eq!(value["rules"][0]["match_fragments"][1]["kind"], "immediately dominates");
        assert_eq!(value["rules"][0]["question_templates"][0]["pattern"], "What is {Q2}?");
    }

    #[test]
    fn test_missing_fields_default() {
        let json = r#"{"rules": [{"name": "bare"}]}"#;
        let repo = RuleRepository::from_reader(json.as_bytes()).unwrap();

        assert_eq!(repo.get(0).unwrap(), &Rule::new("bare"));
        assert!(RuleRepository::from_reader("{}".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            RuleRepository::load_all(&missing),
            Err(RepositoryError::Io { .. })
        ));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            RuleRepository::load_all(&bad),
            Err(RepositoryError::Json(_))
        ));
    }
}
