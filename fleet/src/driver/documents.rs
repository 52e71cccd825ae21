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

//! Extends the driver with the bus document management operations.

use crate::db;
use crate::driver::FleetDriver;
use crate::driver::buses::bus_not_found;
use crate::driver::doctypes::doc_type_not_found;
use crate::model::{
    BusId, Document, DocumentDetails, DocumentId, DocumentUpdate, DocumentWithType, NewDocument,
};
use fleetdocs_core::db::DbError;
use fleetdocs_core::driver::{DriverError, DriverResult};
use log::info;

/// Converts a missing-row error into the document-specific not found error.
fn document_not_found(e: DbError) -> DriverError {
    match e {
        DbError::NotFound => DriverError::NotFound("Document not found".to_owned()),
        e => e.into(),
    }
}

impl FleetDriver {
    /// Gets the documents of the bus identified by `bus_id`, newest first.
    pub async fn list_bus_documents(self, bus_id: BusId) -> DriverResult<Vec<DocumentWithType>> {
        let mut tx = self.db.begin().await?;
        db::get_bus(tx.ex(), &bus_id).await.map_err(bus_not_found)?;
        let documents = db::list_bus_documents(tx.ex(), &bus_id).await?;
        tx.commit().await?;
        Ok(documents)
    }

    /// Attaches a new document to the bus identified by `bus_id`.
    pub async fn create_document(
        self,
        bus_id: BusId,
        new: NewDocument,
    ) -> DriverResult<DocumentDetails> {
        let mut tx = self.db.begin().await?;
        let bus = db::get_bus(tx.ex(), &bus_id).await.map_err(bus_not_found)?;
        let doc_type =
            db::get_doc_type(tx.ex(), &new.doc_type_id).await.map_err(doc_type_not_found)?;

        let document = Document::new(DocumentId::generate(), bus_id, new, self.clock.now_utc());
        db::create_document(tx.ex(), &document).await?;
        tx.commit().await?;

        info!(
            "Document created: id={} bus_id={} doc_type={}",
            document.id().as_str(),
            bus.id().as_str(),
            doc_type.name()
        );
        Ok(DocumentDetails { document, bus, doc_type })
    }

    /// Gets the document identified by `id` along with its bus and its type.
    pub async fn get_document(self, id: DocumentId) -> DriverResult<DocumentDetails> {
        let mut tx = self.db.begin().await?;
        let details = db::get_document(tx.ex(), &id).await.map_err(document_not_found)?;
        tx.commit().await?;
        Ok(details)
    }

    /// Applies a partial `update` to the document identified by `id`.
    ///
    /// The update may move the document to a different type, which must exist.
    pub async fn update_document(
        self,
        id: DocumentId,
        update: DocumentUpdate,
    ) -> DriverResult<DocumentDetails> {
        let mut tx = self.db.begin().await?;
        let DocumentDetails { document, bus, doc_type } =
            db::get_document(tx.ex(), &id).await.map_err(document_not_found)?;

        let doc_type = match &update.doc_type_id {
            Some(doc_type_id) if doc_type_id != doc_type.id() => {
                db::get_doc_type(tx.ex(), doc_type_id).await.map_err(doc_type_not_found)?
            }
            _ => doc_type,
        };

        let document = document.apply(update);
        db::update_document(tx.ex(), &document).await.map_err(document_not_found)?;
        tx.commit().await?;

        info!("Document updated: id={} bus_id={}", document.id().as_str(), bus.id().as_str());
        Ok(DocumentDetails { document, bus, doc_type })
    }

    /// Deletes the document identified by `id`.
    pub async fn delete_document(self, id: DocumentId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        db::delete_document(tx.ex(), &id).await.map_err(document_not_found)?;
        tx.commit().await?;

        info!("Document deleted: id={}", id.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::model::DocumentTypeId;
    use fleetdocs_core::clocks::Clock;
    use fleetdocs_core::clocks::testutils::utc_datetime;
    use fleetdocs_core::model::validation::Patch;

    /// Builds a document creation request of type `doc_type_id`.
    fn new_document(doc_type_id: &DocumentTypeId) -> NewDocument {
        NewDocument {
            doc_type_id: doc_type_id.clone(),
            document_number: Some("INS-1".to_owned()),
            issue_date: Some(utc_datetime(2023, 7, 1, 0, 0, 0)),
            expiry_date: Some(utc_datetime(2024, 6, 30, 0, 0, 0)),
            file_url: "https://files.example.com/ins-1.pdf".to_owned(),
            remarks: None,
        }
    }

    /// Builds an update request that leaves everything unchanged.
    fn keep_all() -> DocumentUpdate {
        DocumentUpdate {
            doc_type_id: None,
            document_number: Patch::Keep,
            issue_date: Patch::Keep,
            expiry_date: Patch::Keep,
            file_url: None,
            remarks: Patch::Keep,
        }
    }

    #[tokio::test]
    async fn test_create_document_ok() {
        let context = TestContext::setup().await;
        let bus = context.create_bus("KA-01").await;
        let doc_type = context.create_doc_type("Insurance").await;

        let details = context
            .driver()
            .create_document(bus.id().clone(), new_document(doc_type.id()))
            .await
            .unwrap();
        assert_eq!(bus, details.bus);
        assert_eq!(doc_type, details.doc_type);
        assert_eq!(bus.id(), details.document.bus_id());
        assert_eq!(&Some("INS-1".to_owned()), details.document.document_number());
        assert_eq!(&context.clock().now_utc(), details.document.uploaded_at());

        let stored = context.driver().get_document(details.document.id().clone()).await.unwrap();
        assert_eq!(details, stored);
    }

    #[tokio::test]
    async fn test_create_document_bus_not_found() {
        let context = TestContext::setup().await;
        let doc_type = context.create_doc_type("Insurance").await;

        match context
            .driver()
            .create_document(BusId::from("missing"), new_document(doc_type.id()))
            .await
        {
            Err(DriverError::NotFound(msg)) => assert_eq!("Bus not found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_create_document_bus_checked_before_type() {
        let context = TestContext::setup().await;

        match context
            .driver()
            .create_document(BusId::from("missing"), new_document(&DocumentTypeId::from("nope")))
            .await
        {
            Err(DriverError::NotFound(msg)) => assert_eq!("Bus not found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_create_document_type_not_found() {
        let context = TestContext::setup().await;
        let bus = context.create_bus("KA-01").await;

        match context
            .driver()
            .create_document(bus.id().clone(), new_document(&DocumentTypeId::from("missing")))
            .await
        {
            Err(DriverError::NotFound(msg)) => assert_eq!("Document type not found", msg),
            e => panic!("{:?}", e),
        }
        assert_eq!(0, db::count_documents(&mut context.ex().await).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_bus_documents() {
        let context = TestContext::setup().await;
        let bus = context.create_bus("KA-01").await;
        let other = context.create_bus("KA-02").await;
        let doc_type = context.create_doc_type("Insurance").await;
        let doc1 = context.create_document(bus.id(), &doc_type, None).await;
        context.clock().advance(std::time::Duration::from_secs(1));
        let doc2 = context.create_document(bus.id(), &doc_type, None).await;
        context.create_document(other.id(), &doc_type, None).await;

        let documents = context.driver().list_bus_documents(bus.id().clone()).await.unwrap();
        assert_eq!(vec![&doc2, &doc1], documents.iter().map(|d| &d.document).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_list_bus_documents_bus_not_found() {
        let context = TestContext::setup().await;

        match context.driver().list_bus_documents(BusId::from("missing")).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Bus not found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_get_document_not_found() {
        let context = TestContext::setup().await;

        match context.driver().get_document(DocumentId::from("missing")).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Document not found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_update_document_fields() {
        let context = TestContext::setup().await;
        let bus = context.create_bus("KA-01").await;
        let doc_type = context.create_doc_type("Insurance").await;
        let details = context
            .driver()
            .create_document(bus.id().clone(), new_document(doc_type.id()))
            .await
            .unwrap();

        let update = DocumentUpdate {
            document_number: Patch::Clear,
            expiry_date: Patch::Set(utc_datetime(2025, 6, 30, 0, 0, 0)),
            remarks: Patch::Set("Renewed".to_owned()),
            ..keep_all()
        };
        let updated =
            context.driver().update_document(details.document.id().clone(), update).await.unwrap();
        assert_eq!(&None, updated.document.document_number());
        assert_eq!(details.document.issue_date(), updated.document.issue_date());
        assert_eq!(&Some(utc_datetime(2025, 6, 30, 0, 0, 0)), updated.document.expiry_date());
        assert_eq!(&Some("Renewed".to_owned()), updated.document.remarks());
        assert_eq!(doc_type, updated.doc_type);

        let stored = context.driver().get_document(details.document.id().clone()).await.unwrap();
        assert_eq!(updated, stored);
    }

    #[tokio::test]
    async fn test_update_document_moves_type() {
        let context = TestContext::setup().await;
        let bus = context.create_bus("KA-01").await;
        let insurance = context.create_doc_type("Insurance").await;
        let permit = context.create_doc_type("Permit").await;
        let document = context.create_document(bus.id(), &insurance, None).await;

        let update = DocumentUpdate { doc_type_id: Some(permit.id().clone()), ..keep_all() };
        let updated =
            context.driver().update_document(document.id().clone(), update).await.unwrap();
        assert_eq!(permit, updated.doc_type);
        assert_eq!(permit.id(), updated.document.doc_type_id());

        let update =
            DocumentUpdate { doc_type_id: Some(DocumentTypeId::from("missing")), ..keep_all() };
        match context.driver().update_document(document.id().clone(), update).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Document type not found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_update_document_not_found() {
        let context = TestContext::setup().await;

        match context.driver().update_document(DocumentId::from("missing"), keep_all()).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Document not found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_delete_document() {
        let context = TestContext::setup().await;
        let bus = context.create_bus("KA-01").await;
        let doc_type = context.create_doc_type("Insurance").await;
        let document = context.create_document(bus.id(), &doc_type, None).await;

        context.driver().delete_document(document.id().clone()).await.unwrap();
        match context.driver().delete_document(document.id().clone()).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Document not found", msg),
            e => panic!("{:?}", e),
        }

        context.driver().delete_bus(bus.id().clone()).await.unwrap();
    }
}
