use qgrules::{
    CommitOutcome, DataSet, EngineConfig, Role, RuleRepository, Scratchpad, SearchError, StructuralMatcher, search,
};
use std::fs;
use tempfile::TempDir;

const DEV: &str = "\
(ROOT (S (NP (DT The) (NN dog)) (VP (VBD chased) (NP (DT the) (NN cat))) (. .)))
(ROOT (S (NP (PRP It)) (VP (VBD rained)) (. .)))
";

const TEST: &str = "(ROOT (S (NP (NNP Mary)) (VP (VBD read) (NP (DT a) (NN book))) (. .)))\n";

fn setup() -> (TempDir, EngineConfig) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dev.stp"), DEV).unwrap();
    fs::write(dir.path().join("test.stp"), TEST).unwrap();
    let config = EngineConfig::from_toml_str(&format!(
        "tree_folder = {:?}\ndev_files = \"dev\"\ntest_files = \"test\"\nrules_file = {:?}\n",
        dir.path().display().to_string(),
        dir.path().join("rules.json").display().to_string(),
    ))
    .unwrap();
    (dir, config)
}

#[test]
fn test_scratchpad_to_search() {
    let (_dir, config) = setup();
    let (data, report) = DataSet::load(&config);
    assert!(report.dev.is_clean() && report.test.is_clean());

    // Author a rule in the scratchpad and commit it
    let pad = Scratchpad::new(
        "object",
        "[1:dominates]VP ([2:immediately dominates]VBD, [3:immediately dominates]NP ([4:immediately dominates]NN))",
        "[dominates]What was {Q2}?",
        "[dominates]{A3}",
    );
    let mut repository = RuleRepository::new();
    let outcome = repository.commit_from_scratchpad(pad.to_rule().unwrap(), |_| None);
    assert_eq!(outcome, CommitOutcome::Appended(0));

    // Persist and reload
    repository.save_all(&config.rules_file).unwrap();
    let repository = RuleRepository::load_all(&config.rules_file).unwrap();
    let rule = repository.get(0).unwrap();
    assert_eq!(Scratchpad::from_rule(rule).unwrap(), pad);

    // Search both data sets, test set first
    let trees = data.trees(true, true).unwrap();
    let rows: Vec<_> = search(rule, &trees, &StructuralMatcher, config.show_tagged)
        .unwrap()
        .collect();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].tree_index, 0);
    assert_eq!(rows[0].question, "What was read?");
    assert_eq!(rows[0].answer, "a book");
    assert_eq!(rows[1].tree_index, 1);
    assert_eq!(rows[1].question, "What was chased?");
    assert_eq!(rows[1].answer, "the cat");

    let marked: Vec<_> = rows[1]
        .sentence
        .iter()
        .filter_map(|token| token.mark.as_ref().map(|mark| (token.text.as_str(), mark.role)))
        .collect();
    assert_eq!(
        marked,
        vec![("chased", Role::Question), ("the", Role::Answer), ("cat", Role::Answer)]
    );
}

#[test]
fn test_locked_rule_survives_declined_commit() {
    let (_dir, config) = setup();
    let mut repository = RuleRepository::new();
    let original = Scratchpad::new("r", "NP", "[dominates]{Q1}", "").to_rule().unwrap();
    repository.add(original.clone());
    repository.get_mut(0).unwrap().locked = true;
    repository.save_all(&config.rules_file).unwrap();

    let edit = Scratchpad::new("r", "VP", "", "").to_rule().unwrap();
    let outcome = repository.commit_from_scratchpad(edit, |_| Some(false));
    assert_eq!(outcome, CommitOutcome::Declined(0));

    let saved = RuleRepository::load_all(&config.rules_file).unwrap();
    assert_eq!(saved, repository);
    assert_eq!(repository.get(0).unwrap().match_fragments, original.match_fragments);

    let copy = repository.clone_rule(0).unwrap();
    assert_eq!(repository.get(copy).unwrap().name, "Copy of r");
    assert!(!repository.get(copy).unwrap().locked);
}

#[test]
fn test_search_needs_data_and_pattern() {
    let (_dir, config) = setup();
    let (data, _) = DataSet::load(&config);

    assert!(matches!(data.trees(false, false), Err(SearchError::NoData)));

    let empty = Scratchpad::new("", "", "", "").to_rule().unwrap();
    let trees = data.trees(true, false).unwrap();
    assert!(matches!(
        search(&empty, &trees, &StructuralMatcher, false),
        Err(SearchError::NoPattern)
    ));
}
