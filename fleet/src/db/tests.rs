// FleetDocs
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Common tests for any database implementation.

use crate::db::*;
use crate::model::{
    Bus, BusId, Document, DocumentId, DocumentType, DocumentTypeId, NewBus, NewDocument,
    NewDocumentType,
};
use fleetdocs_core::clocks::testutils::utc_datetime;
use fleetdocs_core::db::{Db, DbError, Executor};
use std::sync::Arc;
use time::OffsetDateTime;

/// Syntactic sugar to create a bus given its registration number and creation time.
async fn create_simple_bus(
    ex: &mut Executor,
    registration_no: &'static str,
    created_at: OffsetDateTime,
) -> Bus {
    let attrs = NewBus {
        registration_no: registration_no.to_owned(),
        model: None,
        manufacturer: None,
        year_of_make: None,
        owner_name: None,
    };
    let bus = Bus::new(BusId::generate(), attrs, created_at, created_at);
    create_bus(ex, &bus).await.unwrap();
    bus
}

/// Syntactic sugar to create a document type given its name.
async fn create_simple_doc_type(ex: &mut Executor, name: &'static str) -> DocumentType {
    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let attrs = NewDocumentType { name: name.to_owned(), description: None };
    let doc_type = DocumentType::new(DocumentTypeId::generate(), attrs, now, now);
    create_doc_type(ex, &doc_type).await.unwrap();
    doc_type
}

/// Syntactic sugar to create a document with the given expiry date.
async fn create_simple_document(
    ex: &mut Executor,
    bus: &Bus,
    doc_type: &DocumentType,
    expiry_date: Option<OffsetDateTime>,
    uploaded_at: OffsetDateTime,
) -> Document {
    let attrs = NewDocument {
        doc_type_id: doc_type.id().clone(),
        document_number: None,
        issue_date: None,
        expiry_date,
        file_url: "https://files.example.com/doc.pdf".to_owned(),
        remarks: None,
    };
    let document = Document::new(DocumentId::generate(), bus.id().clone(), attrs, uploaded_at);
    create_document(ex, &document).await.unwrap();
    document
}

async fn test_buses_create_and_get(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 2, 3, 4, 5);
    let attrs = NewBus {
        registration_no: "KA-01-1234".to_owned(),
        model: Some("Citaro".to_owned()),
        manufacturer: Some("Mercedes".to_owned()),
        year_of_make: Some(2019),
        owner_name: Some("City Transit".to_owned()),
    };
    let bus = Bus::new(BusId::generate(), attrs, now, now);
    create_bus(&mut ex, &bus).await.unwrap();

    assert_eq!(bus, get_bus(&mut ex, bus.id()).await.unwrap());
    assert_eq!(DbError::NotFound, get_bus(&mut ex, &BusId::from("missing")).await.unwrap_err());
}

async fn test_buses_duplicate_registration(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let bus = create_simple_bus(&mut ex, "KA-01", utc_datetime(2024, 1, 1, 0, 0, 0)).await;
    let other = Bus::new(
        BusId::generate(),
        NewBus {
            registration_no: "KA-01".to_owned(),
            model: None,
            manufacturer: None,
            year_of_make: None,
            owner_name: None,
        },
        utc_datetime(2024, 1, 2, 0, 0, 0),
        utc_datetime(2024, 1, 2, 0, 0, 0),
    );
    assert_eq!(DbError::AlreadyExists, create_bus(&mut ex, &other).await.unwrap_err());

    assert!(bus_registration_taken(&mut ex, "KA-01", None).await.unwrap());
    assert!(!bus_registration_taken(&mut ex, "KA-01", Some(bus.id())).await.unwrap());
    assert!(!bus_registration_taken(&mut ex, "KA-02", None).await.unwrap());
}

async fn test_buses_list_newest_first_with_pages(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let bus1 = create_simple_bus(&mut ex, "A-1", utc_datetime(2024, 1, 1, 0, 0, 0)).await;
    let bus2 = create_simple_bus(&mut ex, "A-2", utc_datetime(2024, 1, 3, 0, 0, 0)).await;
    let bus3 = create_simple_bus(&mut ex, "A-3", utc_datetime(2024, 1, 2, 0, 0, 0)).await;

    let page1 = list_buses(&mut ex, None, 0, 2).await.unwrap();
    assert_eq!(
        vec![bus2.id(), bus3.id()],
        page1.iter().map(|s| s.bus.id()).collect::<Vec<&BusId>>()
    );
    let page2 = list_buses(&mut ex, None, 2, 2).await.unwrap();
    assert_eq!(vec![bus1.id()], page2.iter().map(|s| s.bus.id()).collect::<Vec<&BusId>>());
    assert!(list_buses(&mut ex, None, 10, 2).await.unwrap().is_empty());
    assert!(list_buses(&mut ex, None, u64::MAX, u64::MAX).await.unwrap().is_empty());

    assert_eq!(3, count_buses(&mut ex, None).await.unwrap());
    assert_eq!(3, list_all_buses(&mut ex).await.unwrap().len());
}

async fn test_buses_list_search(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let attrs = NewBus {
        registration_no: "XY-99".to_owned(),
        model: Some("Volvo 9700".to_owned()),
        manufacturer: None,
        year_of_make: None,
        owner_name: Some("Blue_Line Tours".to_owned()),
    };
    let volvo = Bus::new(BusId::generate(), attrs, now, now);
    create_bus(&mut ex, &volvo).await.unwrap();
    create_simple_bus(&mut ex, "KA-01", now).await;

    let found = list_buses(&mut ex, Some("volvo"), 0, 10).await.unwrap();
    assert_eq!(1, found.len());
    assert_eq!(&volvo, &found[0].bus);
    assert_eq!(1, count_buses(&mut ex, Some("volvo")).await.unwrap());

    assert_eq!(1, count_buses(&mut ex, Some("ka-")).await.unwrap());
    assert_eq!(1, count_buses(&mut ex, Some("blue_line")).await.unwrap());
    assert_eq!(0, count_buses(&mut ex, Some("%")).await.unwrap());
    assert_eq!(0, count_buses(&mut ex, Some("nothing")).await.unwrap());
}

async fn test_buses_list_counts_documents(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let bus = create_simple_bus(&mut ex, "A-1", now).await;
    let doc_type = create_simple_doc_type(&mut ex, "Permit").await;
    create_simple_document(&mut ex, &bus, &doc_type, None, now).await;
    create_simple_document(&mut ex, &bus, &doc_type, None, now).await;

    let summaries = list_buses(&mut ex, None, 0, 10).await.unwrap();
    assert_eq!(1, summaries.len());
    assert_eq!(2, summaries[0].count.documents);
    assert_eq!(2, count_bus_documents(&mut ex, bus.id()).await.unwrap());

    let types = list_doc_types(&mut ex).await.unwrap();
    assert_eq!(1, types.len());
    assert_eq!(2, types[0].count.documents);
    assert_eq!(2, count_doc_type_documents(&mut ex, doc_type.id()).await.unwrap());
}

async fn test_buses_update(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let bus = create_simple_bus(&mut ex, "before", utc_datetime(2024, 1, 1, 0, 0, 0)).await;
    let updated = Bus::new(
        bus.id().clone(),
        NewBus {
            registration_no: "after".to_owned(),
            model: Some("Model".to_owned()),
            manufacturer: None,
            year_of_make: Some(2001),
            owner_name: None,
        },
        *bus.created_at(),
        utc_datetime(2024, 2, 1, 0, 0, 0),
    );
    update_bus(&mut ex, &updated).await.unwrap();
    assert_eq!(updated, get_bus(&mut ex, bus.id()).await.unwrap());

    let ghost = Bus::new(
        BusId::from("ghost"),
        NewBus {
            registration_no: "ghost".to_owned(),
            model: None,
            manufacturer: None,
            year_of_make: None,
            owner_name: None,
        },
        *bus.created_at(),
        *bus.created_at(),
    );
    assert_eq!(DbError::NotFound, update_bus(&mut ex, &ghost).await.unwrap_err());
}

async fn test_buses_delete(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let empty = create_simple_bus(&mut ex, "empty", now).await;
    let busy = create_simple_bus(&mut ex, "busy", now).await;
    let doc_type = create_simple_doc_type(&mut ex, "Permit").await;
    let document = create_simple_document(&mut ex, &busy, &doc_type, None, now).await;

    delete_bus(&mut ex, empty.id()).await.unwrap();
    assert_eq!(DbError::NotFound, get_bus(&mut ex, empty.id()).await.unwrap_err());
    assert_eq!(DbError::NotFound, delete_bus(&mut ex, empty.id()).await.unwrap_err());

    assert_eq!(DbError::InUse, delete_bus(&mut ex, busy.id()).await.unwrap_err());
    delete_document(&mut ex, document.id()).await.unwrap();
    delete_bus(&mut ex, busy.id()).await.unwrap();
    assert_eq!(0, count_buses(&mut ex, None).await.unwrap());
}

async fn test_doc_types_crud(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let permit = create_simple_doc_type(&mut ex, "Permit").await;
    let fitness = create_simple_doc_type(&mut ex, "Fitness").await;
    assert_eq!(permit, get_doc_type(&mut ex, permit.id()).await.unwrap());

    let names = list_doc_type_names(&mut ex).await.unwrap();
    assert_eq!(vec!["Fitness".to_owned(), "Permit".to_owned()], names);
    assert_eq!(2, count_doc_types(&mut ex).await.unwrap());

    let renamed = DocumentType::new(
        fitness.id().clone(),
        NewDocumentType {
            name: "Fitness Certificate".to_owned(),
            description: Some("Yearly".to_owned()),
        },
        *fitness.created_at(),
        utc_datetime(2024, 3, 1, 0, 0, 0),
    );
    update_doc_type(&mut ex, &renamed).await.unwrap();
    assert_eq!(renamed, get_doc_type(&mut ex, fitness.id()).await.unwrap());

    delete_doc_type(&mut ex, permit.id()).await.unwrap();
    assert_eq!(DbError::NotFound, get_doc_type(&mut ex, permit.id()).await.unwrap_err());
    assert_eq!(DbError::NotFound, delete_doc_type(&mut ex, permit.id()).await.unwrap_err());
}

async fn test_doc_types_duplicate_name(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let permit = create_simple_doc_type(&mut ex, "Permit").await;
    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let dup = DocumentType::new(
        DocumentTypeId::generate(),
        NewDocumentType { name: "Permit".to_owned(), description: None },
        now,
        now,
    );
    assert_eq!(DbError::AlreadyExists, create_doc_type(&mut ex, &dup).await.unwrap_err());

    assert!(doc_type_name_taken(&mut ex, "Permit", None).await.unwrap());
    assert!(!doc_type_name_taken(&mut ex, "Permit", Some(permit.id())).await.unwrap());
}

async fn test_doc_types_delete_in_use(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let bus = create_simple_bus(&mut ex, "A-1", now).await;
    let doc_type = create_simple_doc_type(&mut ex, "Permit").await;
    create_simple_document(&mut ex, &bus, &doc_type, None, now).await;

    assert_eq!(DbError::InUse, delete_doc_type(&mut ex, doc_type.id()).await.unwrap_err());
    assert_eq!(doc_type, get_doc_type(&mut ex, doc_type.id()).await.unwrap());
}

async fn test_documents_create_and_get(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let bus = create_simple_bus(&mut ex, "A-1", now).await;
    let doc_type = create_simple_doc_type(&mut ex, "Permit").await;

    let attrs = NewDocument {
        doc_type_id: doc_type.id().clone(),
        document_number: Some("P-123".to_owned()),
        issue_date: Some(utc_datetime(2023, 6, 1, 0, 0, 0)),
        expiry_date: Some(utc_datetime(2025, 6, 1, 0, 0, 0)),
        file_url: "https://files.example.com/p.pdf".to_owned(),
        remarks: Some("Original".to_owned()),
    };
    let document = Document::new(DocumentId::generate(), bus.id().clone(), attrs, now);
    create_document(&mut ex, &document).await.unwrap();

    let details = get_document(&mut ex, document.id()).await.unwrap();
    assert_eq!(document, details.document);
    assert_eq!(bus, details.bus);
    assert_eq!(doc_type, details.doc_type);

    assert_eq!(
        DbError::NotFound,
        get_document(&mut ex, &DocumentId::from("missing")).await.unwrap_err()
    );
}

async fn test_documents_create_dangling_references(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let bus = create_simple_bus(&mut ex, "A-1", now).await;
    let doc_type = create_simple_doc_type(&mut ex, "Permit").await;

    let attrs = NewDocument {
        doc_type_id: DocumentTypeId::from("missing"),
        document_number: None,
        issue_date: None,
        expiry_date: None,
        file_url: "https://files.example.com/p.pdf".to_owned(),
        remarks: None,
    };
    let document = Document::new(DocumentId::generate(), bus.id().clone(), attrs, now);
    assert_eq!(DbError::NotFound, create_document(&mut ex, &document).await.unwrap_err());

    let attrs = NewDocument {
        doc_type_id: doc_type.id().clone(),
        document_number: None,
        issue_date: None,
        expiry_date: None,
        file_url: "https://files.example.com/p.pdf".to_owned(),
        remarks: None,
    };
    let document = Document::new(DocumentId::generate(), BusId::from("missing"), attrs, now);
    assert_eq!(DbError::NotFound, create_document(&mut ex, &document).await.unwrap_err());

    assert_eq!(0, count_documents(&mut ex).await.unwrap());
}

async fn test_documents_list_for_bus(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let bus = create_simple_bus(&mut ex, "A-1", utc_datetime(2024, 1, 1, 0, 0, 0)).await;
    let other = create_simple_bus(&mut ex, "A-2", utc_datetime(2024, 1, 1, 0, 0, 0)).await;
    let doc_type = create_simple_doc_type(&mut ex, "Permit").await;

    let old_ts = utc_datetime(2024, 1, 2, 0, 0, 0);
    let old = create_simple_document(&mut ex, &bus, &doc_type, None, old_ts).await;
    let new_ts = utc_datetime(2024, 1, 5, 0, 0, 0);
    let new = create_simple_document(&mut ex, &bus, &doc_type, None, new_ts).await;
    create_simple_document(&mut ex, &other, &doc_type, None, utc_datetime(2024, 1, 3, 0, 0, 0))
        .await;

    let documents = list_bus_documents(&mut ex, bus.id()).await.unwrap();
    assert_eq!(
        vec![&new, &old],
        documents.iter().map(|d| &d.document).collect::<Vec<&Document>>()
    );
    assert!(documents.iter().all(|d| d.doc_type == doc_type));

    assert!(list_bus_documents(&mut ex, &BusId::from("missing")).await.unwrap().is_empty());
    assert_eq!(3, count_documents(&mut ex).await.unwrap());
}

async fn test_documents_expiring_and_expired(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 15, 9, 0, 0);
    let bus = create_simple_bus(&mut ex, "A-1", now).await;
    let doc_type = create_simple_doc_type(&mut ex, "Permit").await;

    let expired_ts = Some(utc_datetime(2024, 1, 10, 0, 0, 0));
    let expired = create_simple_document(&mut ex, &bus, &doc_type, expired_ts, now).await;
    let soon_ts = Some(utc_datetime(2024, 2, 1, 0, 0, 0));
    let soon = create_simple_document(&mut ex, &bus, &doc_type, soon_ts, now).await;
    let later_ts = Some(utc_datetime(2024, 6, 1, 0, 0, 0));
    let later = create_simple_document(&mut ex, &bus, &doc_type, later_ts, now).await;
    let forever = create_simple_document(&mut ex, &bus, &doc_type, None, now).await;

    let cutoff = utc_datetime(2024, 2, 14, 9, 0, 0);
    let expiring = list_expiring_documents(&mut ex, Some(cutoff)).await.unwrap();
    assert_eq!(
        vec![expired.id(), soon.id()],
        expiring.iter().map(|d| d.document.id()).collect::<Vec<&DocumentId>>()
    );
    assert!(expiring.iter().all(|d| d.bus == bus && d.doc_type == doc_type));
    assert_eq!(2, count_expiring_documents(&mut ex, Some(cutoff)).await.unwrap());

    let boundary = list_expiring_documents(&mut ex, Some(utc_datetime(2024, 2, 1, 0, 0, 0)))
        .await
        .unwrap();
    assert_eq!(2, boundary.len());

    let unbounded = list_expiring_documents(&mut ex, None).await.unwrap();
    assert_eq!(
        vec![expired.id(), soon.id(), later.id()],
        unbounded.iter().map(|d| d.document.id()).collect::<Vec<&DocumentId>>()
    );
    assert_eq!(3, count_expiring_documents(&mut ex, None).await.unwrap());

    assert_eq!(1, count_expired_documents(&mut ex, now).await.unwrap());
    assert_eq!(
        0,
        count_expired_documents(&mut ex, utc_datetime(2024, 1, 10, 0, 0, 0)).await.unwrap()
    );

    let unexpired = list_unexpired_documents(&mut ex, now).await.unwrap();
    let mut ids = unexpired.iter().map(|d| d.document.id().clone()).collect::<Vec<DocumentId>>();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    let mut exp_ids = vec![soon.id().clone(), later.id().clone(), forever.id().clone()];
    exp_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(exp_ids, ids);
}

async fn test_documents_update_and_delete(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = utc_datetime(2024, 1, 1, 0, 0, 0);
    let bus = create_simple_bus(&mut ex, "A-1", now).await;
    let permit = create_simple_doc_type(&mut ex, "Permit").await;
    let insurance = create_simple_doc_type(&mut ex, "Insurance").await;
    let document = create_simple_document(&mut ex, &bus, &permit, None, now).await;

    let updated = Document::new(
        document.id().clone(),
        bus.id().clone(),
        NewDocument {
            doc_type_id: insurance.id().clone(),
            document_number: Some("I-9".to_owned()),
            issue_date: None,
            expiry_date: Some(utc_datetime(2025, 1, 1, 0, 0, 0)),
            file_url: "https://files.example.com/i.pdf".to_owned(),
            remarks: None,
        },
        now,
    );
    update_document(&mut ex, &updated).await.unwrap();
    let details = get_document(&mut ex, document.id()).await.unwrap();
    assert_eq!(updated, details.document);
    assert_eq!(insurance, details.doc_type);

    let dangling = Document::new(
        document.id().clone(),
        bus.id().clone(),
        NewDocument {
            doc_type_id: DocumentTypeId::from("missing"),
            document_number: None,
            issue_date: None,
            expiry_date: None,
            file_url: "https://files.example.com/i.pdf".to_owned(),
            remarks: None,
        },
        now,
    );
    assert_eq!(DbError::NotFound, update_document(&mut ex, &dangling).await.unwrap_err());

    delete_document(&mut ex, document.id()).await.unwrap();
    assert_eq!(DbError::NotFound, get_document(&mut ex, document.id()).await.unwrap_err());
    assert_eq!(DbError::NotFound, delete_document(&mut ex, document.id()).await.unwrap_err());
    assert_eq!(DbError::NotFound, update_document(&mut ex, &updated).await.unwrap_err());
}

macro_rules! generate_db_tests [
    ( $setup:expr $(, #[$extra:meta] )? ) => {
        fleetdocs_core::db::testutils::generate_tests!(
            $(#[$extra],)?
            $setup,
            $crate::db::tests,
            test_buses_create_and_get,
            test_buses_duplicate_registration,
            test_buses_list_newest_first_with_pages,
            test_buses_list_search,
            test_buses_list_counts_documents,
            test_buses_update,
            test_buses_delete,
            test_doc_types_crud,
            test_doc_types_duplicate_name,
            test_doc_types_delete_in_use,
            test_documents_create_and_get,
            test_documents_create_dangling_references,
            test_documents_list_for_bus,
            test_documents_expiring_and_expired,
            test_documents_update_and_delete
        );
    }
];

#[cfg(feature = "postgres")]
mod postgres {
    use super::*;
    use fleetdocs_core::db::postgres::testutils::setup;

    generate_db_tests!(
        {
            let db: Arc<dyn Db + Send + Sync> = Arc::new(setup().await);
            init_schema(&mut db.ex().await.unwrap()).await.unwrap();
            db
        },
        #[ignore = "Requires environment configuration and is expensive"]
    );
}

mod sqlite {
    use super::*;
    use fleetdocs_core::db::sqlite::testutils::setup;

    generate_db_tests!({
        let db: Arc<dyn Db + Send + Sync> = Arc::new(setup().await);
        init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        db
    });
}
