//! Transaction guard.

use sqlbridge_core::{Connection, Error, Result, Row, Value};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// An open transaction on a [`Session`].
///
/// Dropping a transaction that was neither committed nor rolled back rolls
/// it back. A failed commit leaves the transaction active.
pub struct Transaction<'s, C: Connection> {
    session: &'s Session<C>,
    state: TxState,
}

impl<C: Connection> std::fmt::Debug for Transaction<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'s, C: Connection> Transaction<'s, C> {
    pub(crate) fn begin(session: &'s Session<C>) -> Result<Self> {
        session.connection().begin()?;
        tracing::debug!(url = %session.connection().url(), "Began transaction");
        Ok(Self {
            session,
            state: TxState::Active,
        })
    }

    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    /// The session this transaction runs on.
    pub fn session(&self) -> Result<&'s Session<C>> {
        self.ensure_active()?;
        Ok(self.session)
    }

    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.session()?.execute(sql, params)
    }

    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.session()?.query(sql, params)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.session.connection().commit()?;
        self.state = TxState::Committed;
        tracing::debug!("Committed transaction");
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.session.connection().rollback()?;
        self.state = TxState::RolledBack;
        tracing::debug!("Rolled back transaction");
        Ok(())
    }

    /// Roll back if still active. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.is_active() {
            self.rollback()
        } else {
            Ok(())
        }
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            TxState::Active => Ok(()),
            TxState::Committed => Err(Error::illegal_state("transaction already committed")),
            TxState::RolledBack => Err(Error::illegal_state("transaction already rolled back")),
        }
    }
}

impl<C: Connection> Drop for Transaction<'_, C> {
    fn drop(&mut self) {
        if self.is_active() {
            tracing::warn!("Transaction dropped while active; rolling back");
            if let Err(e) = self.rollback() {
                tracing::error!(error = %e, "Rollback on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbridge_core::mock::MockConnection;

    fn session() -> (Session<MockConnection>, std::rc::Rc<std::cell::RefCell<sqlbridge_core::mock::MockLog>>) {
        let conn = MockConnection::new("mock:");
        let log = conn.log();
        (Session::new(conn), log)
    }

    #[test]
    fn test_commit_then_reuse_is_illegal() {
        let (session, log) = session();
        let mut tx = session.transaction().unwrap();
        tx.execute("delete from t", &[]).unwrap();
        tx.commit().unwrap();
        assert!(!tx.is_active());
        assert!(tx.commit().unwrap_err().is_illegal_state());
        assert!(tx.execute("delete from t", &[]).unwrap_err().is_illegal_state());
        tx.close().unwrap();
        drop(tx);
        assert_eq!(log.borrow().transactions, vec!["begin", "commit"]);
    }

    #[test]
    fn test_drop_rolls_back() {
        let (session, log) = session();
        {
            let _tx = session.transaction().unwrap();
        }
        assert_eq!(log.borrow().transactions, vec!["begin", "rollback"]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (session, log) = session();
        let mut tx = session.transaction().unwrap();
        tx.close().unwrap();
        tx.close().unwrap();
        assert!(tx.rollback().unwrap_err().is_illegal_state());
        drop(tx);
        assert_eq!(log.borrow().transactions, vec!["begin", "rollback"]);
    }

    #[test]
    fn test_in_transaction_outcomes() {
        let (session, log) = session();
        let n = session.in_transaction(|tx| tx.execute("update t set a = 1", &[])).unwrap();
        assert_eq!(n, 1);
        let err = session
            .in_transaction(|_| Err::<(), _>(Error::illegal_state("abort")))
            .unwrap_err();
        assert!(err.is_illegal_state());
        assert_eq!(
            log.borrow().transactions,
            vec!["begin", "commit", "begin", "rollback"]
        );
    }
}
