use axum::Router;
use listcrate::filtering::{Predicate, SelectorOperator};
use listcrate::{
    EntityFilters, FieldFilterSpec, FieldKind, ListEngine, ListService, OrderingSpec,
    PresetDefinition, SearchConfig, SeaOrmStore, list_router,
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use std::sync::Arc;

pub mod card_entity;

pub type CardStore = SeaOrmStore<card_entity::Entity>;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    // Debug logs of ignored input show up with `--nocapture`
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    seed_cards(&db).await?;

    Ok(db)
}

struct Seed {
    name: &'static str,
    description: Option<&'static str>,
    rarity: i32,
    attribute: &'static str,
    score: Option<i32>,
    tags: &'static str,
    event: Option<&'static str>,
    d_names: &'static str,
}

/// Eight cards, ids 1..=8 in this order.
const CARDS: &[Seed] = &[
    Seed { name: "Rin Summer", description: Some("Beach day"), rarity: 3, attribute: "cool", score: Some(500), tags: "summer,idol", event: Some("Summer"), d_names: r#"{"ja":"凛"}"# },
    Seed { name: "Rin Winter", description: Some(""), rarity: 2, attribute: "cool", score: None, tags: "winter", event: Some("Summer"), d_names: r#"{"fr":"凛","ja":"りん"}"# },
    Seed { name: "Maki Summer", description: None, rarity: 3, attribute: "pure", score: Some(300), tags: "summer", event: Some("Summer"), d_names: r#"{"ja":"真姫"}"# },
    Seed { name: "Maki Idol", description: Some("Stage"), rarity: 1, attribute: "pure", score: Some(100), tags: "idol", event: Some("Winter"), d_names: "{}" },
    Seed { name: "Hanayo Rice", description: Some("Rice 100%"), rarity: 2, attribute: "smile", score: Some(200), tags: "food,idol", event: Some("Winter"), d_names: r#"{"ja":"花陽"}"# },
    Seed { name: "Hanayo Winter", description: None, rarity: 1, attribute: "smile", score: None, tags: "winter", event: None, d_names: "{}" },
    Seed { name: "Nico Smile", description: Some("Smile"), rarity: 3, attribute: "smile", score: Some(700), tags: "idol", event: None, d_names: "{}" },
    Seed { name: "Honoka Bread", description: Some("Bread"), rarity: 2, attribute: "smile", score: Some(400), tags: "food", event: Some("Spring"), d_names: "{}" },
];

async fn seed_cards(db: &DatabaseConnection) -> Result<(), DbErr> {
    for card in CARDS {
        card_entity::ActiveModel {
            name: Set(card.name.to_string()),
            description: Set(card.description.map(str::to_string)),
            rarity: Set(card.rarity),
            attribute: Set(card.attribute.to_string()),
            score: Set(card.score),
            tags: Set(card.tags.to_string()),
            event: Set(card.event.map(str::to_string)),
            d_names: Set(card.d_names.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Filters of the `cards` list used across the integration tests.
pub fn card_filters() -> EntityFilters {
    EntityFilters::builder("cards")
        .text_columns(["name", "description", "tags"])
        .field(FieldFilterSpec::builder("rarity").kind(FieldKind::Integer))
        .field(
            FieldFilterSpec::builder("attribute")
                .kind(FieldKind::Choice)
                .multiple(false),
        )
        .field(
            FieldFilterSpec::builder("tags")
                .kind(FieldKind::MultipleChoice)
                .distinct(true),
        )
        .field(
            FieldFilterSpec::builder("has_description")
                .kind(FieldKind::NullBoolean)
                .selector("description__isnull")
                .multiple(false),
        )
        .field(
            FieldFilterSpec::builder("has_score")
                .kind(FieldKind::NullBoolean)
                .selector("score__isnull"),
        )
        .field(
            FieldFilterSpec::builder("no_event")
                .kind(FieldKind::Boolean)
                .selector("event__isnull"),
        )
        .field(
            FieldFilterSpec::builder("has_story")
                .kind(FieldKind::NullBoolean)
                .selectors(["description__isnull", "event__isnull"])
                .operator_for_selectors(SelectorOperator::Or),
        )
        .field(
            FieldFilterSpec::builder("member").custom(|acc, value, _| {
                acc.and(Predicate::contains("name", value.to_string()))
            }),
        )
        .field(FieldFilterSpec::builder("view").noop(true).multiple(false))
        .search(
            SearchConfig::new()
                .field("name")
                .exact_field("attribute")
                .translated_field("name")
                .label("name", "Name")
                .label("attribute", "Attribute")
                .localized_label("ja", "name", "名前"),
        )
        .ordering(
            OrderingSpec::new(["id"])
                .default_reverse(true)
                .allow("id", "Release date")
                .allow("score", "Score")
                .allow("rarity,id", "Rarity"),
        )
        .preset(
            PresetDefinition::new("super-rare")
                .value("rarity", 3)
                .label("Super rare"),
        )
        .preset(
            PresetDefinition::new("staff-picks")
                .value("attribute", "smile")
                .value("tags", vec!["idol"])
                .requires("staff"),
        )
        .page_size(4)
        .per_line(3)
        .build()
        .expect("card filters are valid")
}

pub fn card_service(db: DatabaseConnection) -> ListService<CardStore> {
    ListService::new(
        Arc::new(ListEngine::default()),
        Arc::new(card_filters()),
        SeaOrmStore::new(db),
    )
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    Router::new().nest("/api/v1/cards", list_router(card_service(db)))
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateCardTable)]
    }
}

pub struct CreateCardTable;

#[async_trait::async_trait]
impl MigrationName for CreateCardTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_card_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateCardTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(CardTable)
            .if_not_exists()
            .col(
                ColumnDef::new(CardColumn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(CardColumn::Name).string().not_null())
            .col(ColumnDef::new(CardColumn::Description).text().null())
            .col(ColumnDef::new(CardColumn::Rarity).integer().not_null())
            .col(ColumnDef::new(CardColumn::Attribute).string().not_null())
            .col(ColumnDef::new(CardColumn::Score).integer().null())
            .col(ColumnDef::new(CardColumn::Tags).string().not_null())
            .col(ColumnDef::new(CardColumn::Event).string().null())
            .col(
                ColumnDef::new(CardColumn::DNames)
                    .text()
                    .not_null()
                    .default("{}"),
            )
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CardTable).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum CardColumn {
    Id,
    Name,
    Description,
    Rarity,
    Attribute,
    Score,
    Tags,
    Event,
    DNames,
}

impl Iden for CardColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::Name => "name",
                Self::Description => "description",
                Self::Rarity => "rarity",
                Self::Attribute => "attribute",
                Self::Score => "score",
                Self::Tags => "tags",
                Self::Event => "event",
                Self::DNames => "d_names",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct CardTable;

impl Iden for CardTable {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "cards").unwrap();
    }
}
