//! End-to-end tests: a bank debit is charged through the processor API, then
//! settled or declined by a signed webhook.

use braintree_gateway::prelude::*;
use braintree_gateway::payments::{ClientAuth, LineItem, PaymentDetails};
use braintree_gateway::webhooks::NotificationTransaction;
use braintree_gateway::webhooks::testing::sample_notification;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    _server: MockServer,
    gateway: BraintreeGateway,
    orders: Arc<MemoryOrderStore>,
    receiver: WebhookReceiver,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/merchants/m1/merchant_accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "merchantAccounts": {"totalItems": 1, "merchantAccount": [
                {"id": "store_usd", "currencyIsoCode": "USD", "status": "active", "default": true}
            ]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/merchants/m1/transactions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "transaction": {
                "id": "ach_txn",
                "status": "settlement_pending",
                "amount": "30.00",
                "currencyIsoCode": "USD",
                "paymentInstrumentType": "us_bank_account",
                "usBankAccountDetails": {
                    "token": "ach_tok",
                    "last4": "6789",
                    "accountType": "checking",
                    "bankName": "First Bank"
                }
            }
        })))
        .mount(&server)
        .await;

    let credentials = Credentials::api_keys("m1", "pk", "sk");
    let auth = ClientAuth::from_credentials(&credentials).unwrap();
    let client = BraintreeClient::new("m1", auth, Environment::Sandbox)
        .with_base_url(server.uri())
        .with_graphql_url(format!("{}/graphql", server.uri()));

    let orders = Arc::new(MemoryOrderStore::new());
    orders.insert(
        Order::new("42", "USD", Decimal::new(3000, 2))
            .with_number("42")
            .with_line_item(LineItem::new("Subscription box", 1, Decimal::new(3000, 2))),
    );

    let signature = WebhookSignature::from_credentials(&credentials).unwrap();
    let gateway = BraintreeGateway::new(
        GatewaySettings::new(GatewayKind::Ach, credentials),
        Arc::new(client),
        orders.clone(),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(MerchantAccountCache::new()),
    );
    let receiver = WebhookReceiver::new(signature.clone(), Reconciler::new(orders.clone()));

    Harness {
        _server: server,
        gateway,
        orders,
        receiver,
    }
}

fn webhook(signature: &WebhookSignature, kind: WebhookKind, transaction: NotificationTransaction) -> WebhookRequest {
    let (bt_signature, bt_payload) = sample_notification(signature, kind, Some(transaction)).unwrap();
    WebhookRequest {
        method: "POST".into(),
        query: HashMap::from([("api".to_string(), "braintree".to_string())]),
        form: HashMap::from([
            ("bt_signature".to_string(), bt_signature),
            ("bt_payload".to_string(), bt_payload),
        ]),
    }
}

#[tokio::test]
async fn test_charge_then_settle() {
    let h = harness().await;
    let signature = WebhookSignature::new("pk", "sk");

    h.gateway
        .charge("42", PaymentDetails::with_token("ach_tok"))
        .await
        .unwrap();
    let order = h.orders.get("42").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OnHold);
    assert_eq!(order.transaction_id(), Some("ach_txn"));

    let outcome = h
        .receiver
        .handle(&webhook(
            &signature,
            WebhookKind::TransactionSettled,
            NotificationTransaction::new("ach_txn").with_amount("30.00", "USD"),
        ))
        .await;
    assert_eq!(outcome.status_code(), Some(200));

    let order = h.orders.get("42").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(
        order.notes.last().unwrap().content,
        "Transaction settled (Transaction ID: ach_txn)\nAmount: USD 30.00"
    );
}

#[tokio::test]
async fn test_charge_then_decline() {
    let h = harness().await;
    let signature = WebhookSignature::new("pk", "sk");

    h.gateway
        .charge("42", PaymentDetails::with_token("ach_tok"))
        .await
        .unwrap();

    let outcome = h
        .receiver
        .handle(&webhook(
            &signature,
            WebhookKind::TransactionSettlementDeclined,
            NotificationTransaction::new("ach_txn")
                .with_status("settlement_declined")
                .with_settlement_response("R01", "Insufficient Funds")
                .with_bank_account(Some("checking"), Some("6789")),
        ))
        .await;
    assert_eq!(outcome.status_code(), Some(200));

    let order = h.orders.get("42").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    let note = &order.notes.last().unwrap().content;
    assert!(note.starts_with("Transaction settlement declined (Transaction ID: ach_txn)"));
    assert!(note.contains("Processor response: Insufficient Funds"));
    assert!(note.contains("checking ending in 6789"));
}

#[tokio::test]
async fn test_settlement_with_wrong_amount_keeps_order_on_hold() {
    let h = harness().await;
    let signature = WebhookSignature::new("pk", "sk");

    h.gateway
        .charge("42", PaymentDetails::with_token("ach_tok"))
        .await
        .unwrap();

    let outcome = h
        .receiver
        .handle(&webhook(
            &signature,
            WebhookKind::TransactionSettled,
            NotificationTransaction::new("ach_txn").with_amount("3.00", "USD"),
        ))
        .await;

    match outcome {
        WebhookOutcome::Acknowledged { reconciliation, .. } => assert_eq!(
            reconciliation,
            Reconciliation::AmountMismatch {
                order_id: "42".into()
            }
        ),
        other => panic!("unexpected outcome: {:?}", other),
    }
    let order = h.orders.get("42").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::OnHold);
}

#[tokio::test]
async fn test_forged_webhook_is_rejected() {
    let h = harness().await;
    let forger = WebhookSignature::new("pk", "not-the-key");

    let outcome = h
        .receiver
        .handle(&webhook(
            &forger,
            WebhookKind::TransactionSettled,
            NotificationTransaction::new("ach_txn").with_amount("30.00", "USD"),
        ))
        .await;
    assert_eq!(outcome.status_code(), Some(400));
    assert_eq!(
        h.orders.get("42").await.unwrap().unwrap().status,
        OrderStatus::Pending
    );
}
