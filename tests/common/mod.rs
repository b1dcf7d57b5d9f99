#![allow(dead_code)]

use rechain::prelude::*;

pub const ROOT: &str = "a660e15c1b8b";
pub const TIP: &str = "58af40a74233";

/// Revisions of the newsroom chain, root first.
pub const REVISIONS: [&str; 6] = [
    "a660e15c1b8b",
    "1c2f3e4d5a6b",
    "7e9a0b1c2d3f",
    "4b5c6d7e8f90",
    "9d8c7b6a5f4e",
    "58af40a74233",
];

/// The newsroom schema history: base tables, then one feature column per
/// step, with a batch step that rebuilds `podcast_generations` on SQLite.
pub fn newsroom_chain() -> RevisionChain {
    let mut chain = RevisionChain::new();

    chain
        .register(
            Migration::new("a660e15c1b8b")
                .message("initial newsroom schema")
                .operation(
                    CreateTable::new("articles")
                        .add_column(Column::new("id", ColumnType::Serial).primary_key())
                        .add_column(Column::new("title", ColumnType::Text).not_null())
                        .column("body", ColumnType::Text),
                )
                .operation(
                    CreateTable::new("newsletters")
                        .add_column(Column::new("id", ColumnType::Serial).primary_key())
                        .add_column(Column::new("subject", ColumnType::Text).not_null()),
                )
                .operation(
                    CreateTable::new("podcast_generations")
                        .add_column(Column::new("id", ColumnType::Serial).primary_key())
                        .add_column(Column::new("article_id", ColumnType::Integer).not_null())
                        .add_column(
                            Column::new("status", ColumnType::VarChar(20))
                                .not_null()
                                .default("'pending'"),
                        ),
                ),
        )
        .unwrap();

    chain
        .register(
            Migration::new("1c2f3e4d5a6b")
                .parent("a660e15c1b8b")
                .message("add article quality metrics")
                .operation(AddColumn::new(
                    "articles",
                    Column::new("quality_metrics", ColumnType::Json),
                )),
        )
        .unwrap();

    chain
        .register(
            Migration::new("7e9a0b1c2d3f")
                .parent("1c2f3e4d5a6b")
                .message("add newsletter tts provider")
                .operation(AddColumn::new(
                    "newsletters",
                    Column::new("tts_provider", ColumnType::VarChar(50)),
                )),
        )
        .unwrap();

    chain
        .register(
            Migration::new("4b5c6d7e8f90")
                .parent("7e9a0b1c2d3f")
                .message("add podcast voice settings")
                .operation(AddColumn::new(
                    "podcast_generations",
                    Column::new("voice_settings", ColumnType::Json),
                )),
        )
        .unwrap();

    chain
        .register(
            Migration::new("9d8c7b6a5f4e")
                .parent("4b5c6d7e8f90")
                .message("relax podcast status")
                .operation(
                    BatchAlterTable::new("podcast_generations")
                        .alter_column_reversible(
                            "status",
                            ColumnChanges::new()
                                .set_type(ColumnType::VarChar(20))
                                .set_nullable(true)
                                .drop_default(),
                            ColumnChanges::new()
                                .set_type(ColumnType::VarChar(20))
                                .set_nullable(false)
                                .set_default("'pending'"),
                        )
                        .rename_column("article_id", "source_article_id"),
                ),
        )
        .unwrap();

    chain
        .register(
            Migration::new("58af40a74233")
                .parent("9d8c7b6a5f4e")
                .message("add article ai provider")
                .operation(AddColumn::new(
                    "articles",
                    Column::new("ai_provider", ColumnType::VarChar(50)),
                )),
        )
        .unwrap();

    chain
}
