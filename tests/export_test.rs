mod common;

use anyhow::Result;
use cash_manager::domain::TransactionType;
use cash_manager::io::Exporter;

use common::{register, test_service};

#[tokio::test]
async fn test_export_history_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "Ada Lovelace", "ada@example.com").await?;

    service
        .add_transaction(&user.id, "Salary", "100", TransactionType::Income)
        .await?;
    service
        .add_transaction(&user.id, "Groceries, weekly", "40.5", TransactionType::Expense)
        .await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_history_csv(&user.id, &mut buffer)
        .await?;
    assert_eq!(count, 2);

    let csv = String::from_utf8(buffer)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "id,created_at,type,description,amount,amount_cents"
    );
    // Newest first, and commas in descriptions are quoted
    assert!(lines[1].contains("expense,\"Groceries, weekly\",40.50,4050"));
    assert!(lines[2].contains("income,Salary,100.00,10000"));

    Ok(())
}

#[tokio::test]
async fn test_export_history_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "Ada Lovelace", "ada@example.com").await?;

    service
        .add_transaction(&user.id, "Salary", "100", TransactionType::Income)
        .await?;
    service
        .add_transaction(&user.id, "Groceries", "40", TransactionType::Expense)
        .await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service)
        .export_history_json(&user.id, &mut buffer)
        .await?;
    assert_eq!(snapshot.balance_cents, 6000);
    assert_eq!(snapshot.transactions.len(), 2);

    let value: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(value["balanceCents"], 6000);
    assert_eq!(value["profile"]["fullName"], "Ada Lovelace");
    assert_eq!(value["transactions"].as_array().map(Vec::len), Some(2));

    Ok(())
}
