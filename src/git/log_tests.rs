//! Unit tests for log argument building and output parsing.
//!
//! Parsing tests run on crafted raw text — no git needed. The raw strings use
//! the same 0x01 separator the client requests from `git log`.

use super::*;
use git_panel::FileStatus;

const SEP: char = '\u{1}';

fn header_line(hash: &str, parents: &str, subject: &str, refs: &str, body: &str) -> String {
    format!(
        "{hash}{SEP}{parents}{SEP}Alice{SEP}alice@example.com{SEP}Mon Jan 5 12:00:00 2026 +0000{SEP}{subject}{SEP}{refs}{SEP}{body}"
    )
}

// ─── Record header detection ────────────────────────────────────────

#[test]
fn test_parse_single_record() {
    let raw = header_line("aaaaaaa", "bbbbbbb", "Fix parser", " (HEAD -> refs/heads/main)", "");
    let commits = parse_log(&raw);
    assert_eq!(commits.len(), 1);
    let c = &commits[0];
    assert_eq!(c.hash, "aaaaaaa");
    assert_eq!(c.parent_hashes, vec!["bbbbbbb"]);
    assert_eq!(c.author_name, "Alice");
    assert_eq!(c.author_email, "alice@example.com");
    assert_eq!(c.message, "Fix parser");
    assert_eq!(c.refs, "(HEAD -> refs/heads/main)");
    assert!(!c.is_merge);
}

#[test]
fn test_parse_two_records() {
    let raw = format!(
        "{}\n{}",
        header_line("aaaaaaa", "bbbbbbb", "Second", "", ""),
        header_line("bbbbbbb", "", "First", "", ""),
    );
    let commits = parse_log(&raw);
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].hash, "aaaaaaa");
    assert_eq!(commits[1].hash, "bbbbbbb");
    assert!(commits[1].parent_hashes.is_empty(), "root commit has no parents");
}

#[test]
fn test_merge_commit_flagged() {
    let raw = header_line("aaaaaaa", "bbbbbbb ccccccc", "Merge branch", "", "");
    let commits = parse_log(&raw);
    assert!(commits[0].is_merge);
    assert_eq!(commits[0].parent_hashes.len(), 2);
}

#[test]
fn test_hash_looking_body_line_does_not_split_records() {
    // A bare hash on its own line has no separator, so it stays in the body
    let raw = format!(
        "{}\nsee also deadbee for context\ndeadbeef00\n",
        header_line("aaaaaaa", "", "Subject", "", "body starts here"),
    );
    let commits = parse_log(&raw);
    assert_eq!(commits.len(), 1);
    assert!(commits[0].body.contains("deadbeef00"));
    assert!(commits[0].body.starts_with("body starts here"));
}

#[test]
fn test_separator_line_with_non_hex_first_field_is_body() {
    let raw = format!(
        "{}\nnot-a-hash{SEP}something",
        header_line("aaaaaaa", "", "Subject", "", ""),
    );
    let commits = parse_log(&raw);
    assert_eq!(commits.len(), 1);
    assert!(commits[0].body.contains("not-a-hash"));
}

#[test]
fn test_lines_before_first_header_are_discarded() {
    let raw = format!("warning: something\n{}", header_line("aaaaaaa", "", "S", "", ""));
    assert_eq!(parse_log(&raw).len(), 1);
}

#[test]
fn test_parse_empty_input() {
    assert!(parse_log("").is_empty());
}

#[test]
fn test_truncated_header_tolerated() {
    // Only hash + parents — remaining fields default to empty
    let raw = format!("aaaaaaa{SEP}bbbbbbb");
    let commits = parse_log(&raw);
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "");
    assert_eq!(commits[0].refs, "");
}

// ─── Stat summary extraction ────────────────────────────────────────

#[test]
fn test_stat_summary_full() {
    let stats = parse_stat_summary(" 3 files changed, 10 insertions(+), 2 deletions(-)").unwrap();
    assert_eq!(stats, CommitStats { files: 3, insertions: 10, deletions: 2 });
}

#[test]
fn test_stat_summary_singular() {
    let stats = parse_stat_summary(" 1 file changed, 1 insertion(+), 1 deletion(-)").unwrap();
    assert_eq!(stats, CommitStats { files: 1, insertions: 1, deletions: 1 });
}

#[test]
fn test_stat_summary_missing_insertions() {
    let stats = parse_stat_summary(" 1 file changed, 4 deletions(-)").unwrap();
    assert_eq!(stats, CommitStats { files: 1, insertions: 0, deletions: 4 });
}

#[test]
fn test_stat_summary_missing_deletions() {
    let stats = parse_stat_summary(" 2 files changed, 7 insertions(+)").unwrap();
    assert_eq!(stats, CommitStats { files: 2, insertions: 7, deletions: 0 });
}

#[test]
fn test_stat_summary_non_matching_line() {
    assert!(parse_stat_summary("nothing changed here").is_none());
}

#[test]
fn test_record_with_stat_block() {
    let raw = format!(
        "{}\n src/main.rs | 10 +++++-----\n src/lib.rs  |  2 +-\n 2 files changed, 7 insertions(+), 5 deletions(-)",
        header_line("aaaaaaa", "", "Change", "", ""),
    );
    let commits = parse_log(&raw);
    let c = &commits[0];
    assert_eq!(c.stats, Some(CommitStats { files: 2, insertions: 7, deletions: 5 }));
    // stat histogram lines must not leak into the body
    assert!(c.body.is_empty(), "body was {:?}", c.body);
}

#[test]
fn test_body_and_stat_block_separated() {
    let raw = format!(
        "{}\nsecond body line\n\n src/a.rs | 1 +\n 1 file changed, 1 insertion(+)",
        header_line("aaaaaaa", "", "Subject", "", "first body line"),
    );
    let c = &parse_log(&raw)[0];
    assert!(c.body.contains("first body line"));
    assert!(c.body.contains("second body line"));
    assert!(!c.body.contains("a.rs"));
    assert_eq!(c.stats.map(|s| s.files), Some(1));
}

// ─── Name-status parsing ────────────────────────────────────────────

#[test]
fn test_name_status_modified() {
    let f = parse_name_status_line("M\tsrc/main.rs").unwrap();
    assert_eq!(f.status, FileStatus::Modified);
    assert_eq!(f.path, "src/main.rs");
    assert!(f.old_path.is_none());
    assert!(f.similarity.is_none());
}

#[test]
fn test_name_status_rename_with_similarity() {
    let f = parse_name_status_line("R86\tsrc/old.rs\tsrc/new.rs").unwrap();
    assert_eq!(f.status, FileStatus::Renamed);
    assert_eq!(f.path, "src/new.rs");
    assert_eq!(f.old_path.as_deref(), Some("src/old.rs"));
    assert_eq!(f.similarity, Some(86));
}

#[test]
fn test_name_status_copy() {
    let f = parse_name_status_line("C75\ta.txt\tb.txt").unwrap();
    assert_eq!(f.status, FileStatus::Copied);
    assert_eq!(f.old_path.as_deref(), Some("a.txt"));
    assert_eq!(f.path, "b.txt");
}

#[test]
fn test_name_status_type_change_is_modified() {
    let f = parse_name_status_line("T\tsymlink").unwrap();
    assert_eq!(f.status, FileStatus::Modified);
}

#[test]
fn test_name_status_unknown_letter_skipped() {
    assert!(parse_name_status_line("X\tweird").is_none());
}

#[test]
fn test_name_status_malformed_skipped() {
    assert!(parse_name_status_line("no tab here").is_none());
    assert!(parse_name_status_line("").is_none());
}

#[test]
fn test_parse_name_status_output() {
    let out = "M\tsrc/a.rs\nA\tsrc/b.rs\nD\told.rs\n\ngarbage line\n";
    let files = parse_name_status(out);
    assert_eq!(files.len(), 3);
    assert_eq!(files[0].status, FileStatus::Modified);
    assert_eq!(files[1].status, FileStatus::Added);
    assert_eq!(files[2].status, FileStatus::Deleted);
}

// ─── Argument building ──────────────────────────────────────────────

#[test]
fn test_log_args_defaults_use_all() {
    let args = log_args(&Filter::default());
    assert!(args.contains(&"--all".to_string()));
    assert!(args.contains(&"--skip=0".to_string()));
    assert!(args.contains(&"--max-count=45".to_string()));
    assert!(args.contains(&"--decorate=full".to_string()));
    assert!(args.contains(&"--stat".to_string()));
    assert!(!args.iter().any(|a| a.starts_with("--grep")));
}

#[test]
fn test_log_args_branch_filter_replaces_all() {
    let f = Filter { branches: Some(vec!["main".into()]), ..Filter::default() };
    let args = log_args(&f);
    assert!(args.contains(&"main".to_string()));
    assert!(!args.contains(&"--all".to_string()));
}

#[test]
fn test_log_args_hash_search_is_direct_lookup() {
    let f = Filter { search: Some("abcdef0".into()), ..Filter::default() };
    let args = log_args(&f);
    assert!(args.contains(&"abcdef0".to_string()));
    assert!(args.contains(&"--max-count=1".to_string()));
    assert!(!args.contains(&"--all".to_string()));
    assert!(!args.iter().any(|a| a.starts_with("--grep")));
}

#[test]
fn test_log_args_six_hex_chars_routes_to_grep() {
    let f = Filter { search: Some("abcdef".into()), ..Filter::default() };
    let args = log_args(&f);
    assert!(args.contains(&"--grep=abcdef".to_string()));
    assert!(args.contains(&"--regexp-ignore-case".to_string()));
    assert!(args.contains(&"--all".to_string()));
}

#[test]
fn test_log_args_non_hex_search_routes_to_grep() {
    let f = Filter { search: Some("fix bug".into()), ..Filter::default() };
    let args = log_args(&f);
    assert!(args.contains(&"--grep=fix bug".to_string()));
}

#[test]
fn test_log_args_author_and_pagination() {
    let f = Filter {
        author: Some("alice".into()),
        page: 3,
        page_size: 20,
        ..Filter::default()
    };
    let args = log_args(&f);
    assert!(args.contains(&"--author=alice".to_string()));
    assert!(args.contains(&"--skip=40".to_string()));
    assert!(args.contains(&"--max-count=20".to_string()));
}

#[test]
fn test_edge_args_span_floor() {
    let args = edge_args(&Filter::default());
    // (page 1 + 1) * 45 = 90 < floor 100
    assert!(args.contains(&"--max-count=100".to_string()));
    assert!(args.contains(&"--all".to_string()));
    assert!(args.contains(&"--pretty=format:%H %P".to_string()));
}

#[test]
fn test_edge_args_span_scales_with_page() {
    let f = Filter { page: 4, page_size: 50, ..Filter::default() };
    let args = edge_args(&f);
    assert!(args.contains(&"--max-count=250".to_string()));
}

#[test]
fn test_edge_args_keep_branch_scope() {
    let f = Filter { branches: Some(vec!["dev".into()]), ..Filter::default() };
    let args = edge_args(&f);
    assert!(args.contains(&"dev".to_string()));
    assert!(!args.contains(&"--all".to_string()));
}

// ─── Parent-edge parsing ────────────────────────────────────────────

#[test]
fn test_parse_parent_edges() {
    let raw = "aaaaaaa bbbbbbb ccccccc\nbbbbbbb ddddddd\nddddddd\n";
    let edges = parse_parent_edges(raw);
    assert_eq!(edges["aaaaaaa"], vec!["bbbbbbb", "ccccccc"]);
    assert_eq!(edges["bbbbbbb"], vec!["ddddddd"]);
    assert!(edges["ddddddd"].is_empty());
}

#[test]
fn test_parse_parent_edges_skips_garbage() {
    let edges = parse_parent_edges("not-a-hash x y\n\naaaaaaa bbbbbbb\n");
    assert_eq!(edges.len(), 1);
    assert!(edges.contains_key("aaaaaaa"));
}

// ─── Error classification ───────────────────────────────────────────

#[test]
fn test_missing_revision_detection() {
    assert!(is_missing_revision("fatal: bad revision 'zzz'"));
    assert!(is_missing_revision("error: unknown revision or path not in the working tree"));
    assert!(is_missing_revision("fatal: your current branch does not have any commits yet"));
    assert!(!is_missing_revision("warning: refname 'main' is ambiguous"));
    assert!(!is_missing_revision(""));
}
