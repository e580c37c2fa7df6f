//! SQL for the InnoDB compression views.

pub(super) const INNODB_CMP_QUERY: &str = r#"
    SELECT
        page_size,
        compress_ops,
        compress_ops_ok,
        compress_time,
        uncompress_ops,
        uncompress_time
      FROM information_schema.innodb_cmp
"#;

pub(super) const INNODB_CMP_RESET_QUERY: &str = r#"
    SELECT
        page_size,
        compress_ops,
        compress_ops_ok,
        compress_time,
        uncompress_ops,
        uncompress_time
      FROM information_schema.innodb_cmp_reset
"#;
