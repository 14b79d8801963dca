use linkfix_core::*;
use linkfix_storage::Storage;
use tempfile::TempDir;

async fn service(temp: &TempDir) -> LinkFixer {
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    LinkFixer::new(RuleStore::new(storage))
}

fn replace(old: &str, new: &str) -> Fixer {
    Fixer::Replace { old: old.to_owned(), new: new.to_owned() }
}

#[tokio::test]
async fn replace_rule_fixes_first_link() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;
    let request = RuleRequest::Replace { old: "twitter.com".into(), new: "fxtwitter.com".into() };
    fixer.register_rule("guild_1", "twitter.com", request).await.unwrap();

    let link = fixer.fix_message("guild_1", "see https://twitter.com/u/status/1").unwrap().unwrap();

    assert_eq!(link.original, "https://twitter.com/u/status/1");
    assert_eq!(link.fixed, "https://fxtwitter.com/u/status/1");
}

#[tokio::test]
async fn prepend_rule_wraps_whole_url() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;
    fixer
        .register_rule("guild_1", "instagram.com", RuleRequest::Prepend { prefix: "vx".into() })
        .await
        .unwrap();

    let link = fixer.fix_message("guild_1", "http://instagram.com/p/xyz").unwrap().unwrap();

    assert_eq!(link.fixed, "vxhttp://instagram.com/p/xyz");
}

#[tokio::test]
async fn query_is_dropped_before_fixing() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;
    let request = RuleRequest::Replace { old: "x.com".into(), new: "fixupx.com".into() };
    fixer.register_rule("guild_1", "https://www.X.com/home", request).await.unwrap();

    let link = fixer.fix_message("guild_1", "https://x.com/a/status/2?s=20&t=abc").unwrap().unwrap();

    assert_eq!(link.original, "https://x.com/a/status/2?s=20&t=abc");
    assert_eq!(link.fixed, "https://fixupx.com/a/status/2");
}

#[tokio::test]
async fn messages_without_matching_rules_are_left_alone() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;
    fixer
        .register_rule("guild_1", "instagram.com", RuleRequest::Prepend { prefix: "vx".into() })
        .await
        .unwrap();

    assert_eq!(fixer.fix_message("guild_1", "no links here").unwrap(), None);
    assert_eq!(fixer.fix_message("guild_1", "https://example.com/p").unwrap(), None);
    assert_eq!(fixer.fix_message("guild_2", "http://instagram.com/p/xyz").unwrap(), None);
    assert_eq!(fixer.fix_message(&"g".repeat(300), "http://instagram.com/p/xyz").unwrap(), None);
}

#[tokio::test]
async fn broken_stored_regex_yields_no_link() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;
    let broken = Fixer::RegexReplace { pattern: "(".to_owned(), replacement: "x".to_owned() };
    fixer.store().put("g", "a.com", &broken).await.unwrap();

    assert_eq!(fixer.fix_message("g", "https://a.com/p").unwrap(), None);
    assert!(fixer.fix_all("g", "https://a.com/p https://a.com/q").unwrap().is_empty());
}

#[tokio::test]
async fn fix_all_handles_every_link() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;
    fixer
        .register_rule("g", "instagram.com", RuleRequest::Prepend { prefix: "vx".into() })
        .await
        .unwrap();
    let request = RuleRequest::RegexReplace {
        pattern: r"^https://(?:www\.)?reddit\.com/".into(),
        replacement: "https://old.reddit.com/".into(),
    };
    fixer.register_rule("g", "reddit.com", request).await.unwrap();

    let text = "a http://instagram.com/p/1 b https://example.com c https://www.reddit.com/r/rust";
    let fixed: Vec<_> = fixer.fix_all("g", text).unwrap().into_iter().map(|l| l.fixed).collect();

    assert_eq!(fixed, ["vxhttp://instagram.com/p/1", "https://old.reddit.com/r/rust"]);
}

#[tokio::test]
async fn registration_validates_before_storing() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;

    let bad_regex = RuleRequest::RegexReplace { pattern: "(".into(), replacement: "x".into() };
    let empty_prefix = RuleRequest::Prepend { prefix: String::new() };

    assert!(matches!(
        fixer.register_rule("g", "a.com", bad_regex).await,
        Err(FixerError::Pattern { .. })
    ));
    assert!(matches!(
        fixer.register_rule("g", "a.com", empty_prefix).await,
        Err(FixerError::Validation { .. })
    ));
    assert!(matches!(
        fixer.register_rule("g", "not a url", RuleRequest::Prepend { prefix: "x".into() }).await,
        Err(FixerError::Validation { .. })
    ));
    assert!(matches!(
        fixer.register_rule("", "a.com", RuleRequest::Prepend { prefix: "x".into() }).await,
        Err(FixerError::Validation { .. })
    ));
    assert!(fixer.list_rules("g").unwrap().is_empty());
}

#[tokio::test]
async fn overwrite_and_idempotent_delete() {
    let temp = TempDir::new().unwrap();
    let store = service(&temp).await.store().clone();

    store.put("g", "a.com", &replace("a", "b")).await.unwrap();
    store.put("g", "a.com", &replace("a", "c")).await.unwrap();
    assert_eq!(store.get("g", "a.com").unwrap(), Some(replace("a", "c")));

    store.delete("g", "missing.com").await.unwrap();
    store.delete("g", "a.com").await.unwrap();
    store.delete("g", "a.com").await.unwrap();
    store.delete("unknown", "a.com").await.unwrap();
    assert_eq!(store.get("g", "a.com").unwrap(), None);
    assert!(store.namespaces().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn namespaces_do_not_interfere() {
    let temp = TempDir::new().unwrap();
    let store = service(&temp).await.store().clone();

    let mut tasks = tokio::task::JoinSet::new();
    for round in 0..8 {
        for ns in ["ns_a", "ns_b"] {
            let store = store.clone();
            tasks.spawn(async move {
                let fixer = Fixer::Prepend { prefix: format!("{ns}-{round}") };
                store.put(ns, "example.com", &fixer).await.unwrap();
                store.put(ns, &format!("site{round}.com"), &fixer).await.unwrap();
            });
        }
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    for ns in ["ns_a", "ns_b"] {
        let rules = store.list(ns).unwrap();
        assert_eq!(rules.len(), 9);
        let Some(Fixer::Prepend { prefix }) = rules.get("example.com") else {
            panic!("missing example.com in {ns}");
        };
        assert!(prefix.starts_with(ns), "{ns} saw {prefix}");
    }
}

#[tokio::test]
async fn rules_survive_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let fixer = service(&temp).await;
        let request = RuleRequest::RegexReplace { pattern: "a(b)".into(), replacement: "$1".into() };
        fixer.register_rule("g", "a.com", request).await.unwrap();
        fixer.register_rule("g", "b.com", RuleRequest::Prepend { prefix: "p".into() }).await.unwrap();
    }

    let fixer = service(&temp).await;
    assert_eq!(
        fixer.list_rules("g").unwrap(),
        vec![
            ("a.com".to_owned(), "regex replace 'a(b)' with '$1'".to_owned()),
            ("b.com".to_owned(), "prepend 'p'".to_owned()),
        ]
    );
}

#[tokio::test]
async fn import_is_all_or_nothing() {
    let temp = TempDir::new().unwrap();
    let fixer = service(&temp).await;

    let err = fixer.import_rules("g", "replace,twitter.com,old,new\nbadline").await.unwrap_err();
    assert!(matches!(err, FixerError::Import { line: 2, .. }));
    assert!(fixer.list_rules("g").unwrap().is_empty());

    let count = fixer
        .import_rules("g", "replace,twitter.com,twitter.com,fxtwitter.com\nprepend,instagram.com,vx\n")
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(fixer.list_rules("g").unwrap().len(), 2);
}

#[tokio::test]
async fn write_timeout_never_leaves_partial_batches() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    let store = RuleStore::new(storage).with_timeout(std::time::Duration::from_nanos(1));

    let rules = (0..200).map(|i| (format!("site{i}.com"), replace("a", "b"))).collect();
    let result = store.put_many("g", rules).await;
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let stored = store.list("g").unwrap().len();
    match result {
        Ok(count) => assert_eq!(count, 200),
        Err(err) => assert!(matches!(err, StoreError::Timeout { .. })),
    }
    assert!(stored == 0 || stored == 200, "saw {stored} rules");
}
