use crate::{
    domain::{Page, PageRequest, PointsTransaction},
    ports::database::{MembershipStore, TransactionStore},
};
use uuid::Uuid;

use super::Error;

/// Page of a member's ledger, newest first
///
/// Out-of-range paging values are clamped rather than rejected, see [`PageRequest::new`].
#[derive(Clone, Copy, Debug)]
pub struct ListTransactionsRequest {
    pub member_id: Uuid,
    pub page: u32,
    pub page_size: u32,
}

/// Single ledger entry of a member
#[derive(Clone, Copy, Debug)]
pub struct GetTransactionRequest {
    pub member_id: Uuid,
    pub transaction_id: Uuid,
}

command_service!(ListTransactionsRequest => Page<PointsTransaction>, |engine, req| {
    let database = engine.database.clone();
    Box::pin(async move {
        let page = PageRequest::new(req.page, req.page_size);
        // Unknown members are reported rather than shown an empty ledger
        database.get_by_member(req.member_id).await?;
        let (items, total) = database.list_by_member(req.member_id, page).await?;

        Ok(Page::new(items, page, total))
    })
});

command_service!(GetTransactionRequest => PointsTransaction, |engine, req| {
    let database = engine.database.clone();
    Box::pin(async move {
        let transaction = database.get_by_id(req.transaction_id).await?;
        // Other members' entries are reported as missing
        if transaction.member_id != req.member_id {
            return Err(Error::TransactionNotFound(req.transaction_id));
        }
        Ok(transaction)
    })
});
