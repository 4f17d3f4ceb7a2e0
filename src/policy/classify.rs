//! Classifiers of a logical request used for policy selection.

use std::fmt;

/// The kind of entity a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DatabaseAccount,
    Database,
    DocumentCollection,
    Document,
    Attachment,
    User,
    Permission,
    StoredProcedure,
    Trigger,
    UserDefinedFunction,
    Conflict,
    Offer,
    PartitionKeyRange,
    ClientEncryptionKey,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::DatabaseAccount => "database_account",
            ResourceKind::Database => "database",
            ResourceKind::DocumentCollection => "document_collection",
            ResourceKind::Document => "document",
            ResourceKind::Attachment => "attachment",
            ResourceKind::User => "user",
            ResourceKind::Permission => "permission",
            ResourceKind::StoredProcedure => "stored_procedure",
            ResourceKind::Trigger => "trigger",
            ResourceKind::UserDefinedFunction => "user_defined_function",
            ResourceKind::Conflict => "conflict",
            ResourceKind::Offer => "offer",
            ResourceKind::PartitionKeyRange => "partition_key_range",
            ResourceKind::ClientEncryptionKey => "client_encryption_key",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Read,
    ReadFeed,
    Replace,
    Upsert,
    Patch,
    Delete,
    Query,
    QueryPlan,
    /// Execution of a stored procedure's script.
    ExecuteStoredProcedure,
    Head,
    HeadFeed,
    Batch,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Read => "read",
            OperationKind::ReadFeed => "read_feed",
            OperationKind::Replace => "replace",
            OperationKind::Upsert => "upsert",
            OperationKind::Patch => "patch",
            OperationKind::Delete => "delete",
            OperationKind::Query => "query",
            OperationKind::QueryPlan => "query_plan",
            OperationKind::ExecuteStoredProcedure => "execute_stored_procedure",
            OperationKind::Head => "head",
            OperationKind::HeadFeed => "head_feed",
            OperationKind::Batch => "batch",
        }
    }

    /// Default read/write classification; callers may override it per request.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            OperationKind::Read
                | OperationKind::ReadFeed
                | OperationKind::Query
                | OperationKind::QueryPlan
                | OperationKind::Head
                | OperationKind::HeadFeed
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
