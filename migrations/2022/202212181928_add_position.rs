//! Migration: Add default positions
//! Version: 202212181928
//! Description: Seeds the `position` collection of every tenant with the default job positions

use shoreline::bson::{doc, Document};
use shoreline::migration::{DocumentManager, Migration, MigrationContext, TargetDatabases};
use shoreline::StoreError;

const POSITIONS: &[(&str, &str, &str)] = &[
    (
        "Chief executive office",
        "A chief executive officer (CEO) is one of a number of corporate executives charged with the management of an organization.",
        "EXECUTIVE",
    ),
    (
        "Chief financial officer",
        "The chief financial officer (CFO) is assigned the primary responsibility for managing the company's finances, including financial planning, management of financial risks, record-keeping, and financial reporting.",
        "EXECUTIVE",
    ),
    (
        "Chief information officer",
        "Chief information officer (CIO) is a job title commonly given to the most senior executive in an enterprise who works with information technology and computer systems.",
        "EXECUTIVE",
    ),
    (
        "Chief marketing officer",
        "A chief marketing officer (CMO) is a corporate executive responsible for managing marketing activities in an organization.",
        "EXECUTIVE",
    ),
    (
        "Chief operations officer",
        "A chief operating officer (COO) is one of the highest-ranking executive positions in an organization, usually second-in-command at the firm.",
        "EXECUTIVE",
    ),
    (
        "Human resources manager",
        "Human resource management is the strategic approach to the effective and efficient management of people in a company or organization.",
        "MANAGEMENT",
    ),
    (
        "Information technology manager",
        "Information technology management is the discipline whereby all of the information technology resources of a firm are managed in accordance with its needs and priorities.",
        "MANAGEMENT",
    ),
    (
        "Marketing manager",
        "Marketing management focuses on the practical application of marketing orientation, techniques and methods inside enterprises and organizations.",
        "MANAGEMENT",
    ),
    (
        "Product manager",
        "A product manager (PM) is responsible for the development of products for an organization, known as the practice of product management.",
        "MANAGEMENT",
    ),
    (
        "Sales manager",
        "Sales management is focused on the practical application of sales techniques and the management of a firm's sales operations.",
        "MANAGEMENT",
    ),
    (
        "Administrative assistant",
        "A person responsible for providing various kinds of administrative assistance is called an administrative assistant.",
        "OPERATIONAL",
    ),
    (
        "Bookkeeper",
        "Bookkeeping is the recording of financial transactions, and is part of the process of accounting in business and other organizations.",
        "OPERATIONAL",
    ),
    (
        "Business analyst",
        "A business analyst (BA) processes, interprets and documents business processes, products, services and software through analysis of data.",
        "OPERATIONAL",
    ),
    (
        "Sales representative",
        "A person who sells goods or service on behalf of the owner is known as a salesman or saleswoman or salesperson.",
        "OPERATIONAL",
    ),
    (
        "Software engineer",
        "A software engineer applies the principles of software engineering to design, develop, maintain, test, and evaluate computer software.",
        "OPERATIONAL",
    ),
];

const COLLECTION: &str = "position";

pub struct AddDefaultPositions;

impl Migration for AddDefaultPositions {
    fn name(&self) -> &str {
        "2022/202212181928_add_position.rs"
    }

    fn description(&self) -> Option<&str> {
        Some("Add default positions")
    }

    fn target_databases(&self) -> TargetDatabases {
        TargetDatabases::All
    }

    fn execute(&self, db: &DocumentManager<'_>, context: &MigrationContext) -> Result<(), StoreError> {
        let documents: Vec<Document> = POSITIONS
            .iter()
            .map(|(name, description, level)| {
                doc! {
                    "_id": context.uuid(),
                    "name": *name,
                    "description": *description,
                    "level": *level,
                    "creationDate": context.now(),
                }
            })
            .collect();
        db.insert_many(COLLECTION, documents)?;
        Ok(())
    }

    fn rollback(&self, db: &DocumentManager<'_>, _context: &MigrationContext) -> Result<(), StoreError> {
        for (name, _, _) in POSITIONS {
            db.delete_one(COLLECTION, doc! { "name": *name })?;
        }
        Ok(())
    }
}
