use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::Args;
use listing_desk::config::MarketplaceConfig;
use listing_desk::error::AppError;
use listing_desk::marketplace::{
    load_listing_drafts, parse_listing_drafts, Actor, Listing, ListingDraft, PropertyType, Role,
    TakeoverResponse, TransactionKind, UserPreferences,
};

use crate::infra::{in_memory_desk, InMemoryDesk};

const DEMO_LISTINGS_CSV: &str = "\
title,description,property_type,transaction,price,area,bedrooms,bathrooms,city,district,address,images
Căn hộ 2PN Vinhomes Smart City,\"Căn hộ 2 phòng ngủ hướng Đông Nam, full nội thất, sổ hồng chính chủ. Gần trường học và công viên, bàn giao ngay.\",apartment,buy,3.2 tỷ,68,2,2,Hà Nội,Nam Từ Liêm,Tây Mỗ,living.jpg|bedroom.jpg|view.jpg
Nhà phố Thảo Điền,Nhà 3 tầng hẻm xe hơi,house,buy,12 tỷ,90,4,3,Hồ Chí Minh,Thủ Đức,Nguyễn Văn Hưởng,
Bán đất nền giá sốc,Lừa đảo đặt cọc nhanh,land,buy,500 triệu,120,,,Đà Nẵng,,,
";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Seed the demo from a listing CSV export instead of the built-in sample.
    #[arg(long)]
    pub(crate) listings_csv: Option<PathBuf>,
    /// Skip the broker takeover portion of the demo.
    #[arg(long)]
    pub(crate) skip_takeover: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ModerateArgs {
    /// Listing CSV export to score
    pub(crate) csv: PathBuf,
    /// Print the moderated listings as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_moderation(args: ModerateArgs) -> Result<(), AppError> {
    let ModerateArgs { csv, json } = args;
    let drafts = load_listing_drafts(&csv)?;
    let (desk, _) = in_memory_desk(&MarketplaceConfig::default());
    let seller = Actor::new("cli-import", Role::Seller);

    let mut moderated = Vec::with_capacity(drafts.len());
    for draft in drafts {
        moderated.push(desk.lifecycle().submit(&seller, draft)?);
    }

    if json {
        match serde_json::to_string_pretty(&moderated) {
            Ok(payload) => println!("{}", payload),
            Err(err) => eprintln!("failed to render listings: {}", err),
        }
        return Ok(());
    }

    println!("Moderated {} listing(s) from {}", moderated.len(), csv.display());
    for listing in &moderated {
        print_moderation(listing);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        listings_csv,
        skip_takeover,
    } = args;

    let drafts = match listings_csv {
        Some(path) => load_listing_drafts(path)?,
        None => parse_listing_drafts(DEMO_LISTINGS_CSV.as_bytes())?,
    };

    let config = MarketplaceConfig::default();
    let (desk, collaborators) = in_memory_desk(&config);
    let seller = Actor::new("seller-lan", Role::Seller);
    let admin = Actor::new("admin-01", Role::Admin);
    let buyer = Actor::new("buyer-hung", Role::User);

    println!("Listing desk demo");
    println!(
        "  Fees: post {} VND, push {} VND, takeover {} VND",
        config.fees.post_listing, config.fees.push_listing, config.fees.takeover
    );

    println!("\nSubmission and automated moderation");
    let listings = submit_all(&desk, &seller, drafts)?;
    for listing in &listings {
        print_moderation(listing);
    }

    println!("\nAdmin review queue");
    let queue = desk.lifecycle().review_queue(&admin)?;
    if queue.is_empty() {
        println!("  Nothing awaiting review");
    }
    for pending in queue {
        let approved = desk.lifecycle().approve(&admin, &pending.id)?;
        println!(
            "  {} approved by {} -> {}",
            approved.id, admin.id, approved.status
        );
    }

    if !skip_takeover {
        run_takeover(&desk, &seller, &listings);
    }

    println!("\nRecommendations for {}", buyer.id);
    desk.recommendations().save_preferences(
        &buyer,
        UserPreferences {
            transaction: Some(TransactionKind::Buy),
            property_types: vec![PropertyType::Apartment, PropertyType::House],
            cities: vec!["Hà Nội".to_string()],
            price_range: Some("2-4 tỷ".to_string()),
            min_area: Some(60.0),
            min_bedrooms: Some(2),
        },
    )?;
    let ranked = desk.recommendations().recommend_for(&buyer, 5)?;
    if ranked.is_empty() {
        println!("  No published listing matches the saved profile");
    }
    for (position, candidate) in ranked.iter().enumerate() {
        println!(
            "  #{} {} (score {}): {}",
            position + 1,
            candidate.listing.title,
            candidate.score,
            candidate.reasons.join("; ")
        );
    }

    println!("\nRevenue summary (last hour)");
    let now = Utc::now();
    let totals = desk
        .lifecycle()
        .revenue_summary(&admin, now - Duration::hours(1), now)?;
    for (payment_type, totals) in &totals {
        println!(
            "  {:<14} {:>3} payment(s) {:>10} VND",
            payment_type.label(),
            totals.count,
            totals.total
        );
    }
    println!(
        "  Ledger entries recorded: {}",
        collaborators.payments.entries().len()
    );

    Ok(())
}

fn submit_all(
    desk: &InMemoryDesk,
    seller: &Actor,
    drafts: Vec<ListingDraft>,
) -> Result<Vec<Listing>, AppError> {
    let mut submitted = Vec::with_capacity(drafts.len());
    for draft in drafts {
        submitted.push(desk.lifecycle().submit(seller, draft)?);
    }
    Ok(submitted)
}

fn run_takeover(desk: &InMemoryDesk, seller: &Actor, listings: &[Listing]) {
    println!("\nBroker takeover");
    let Some(target) = listings
        .iter()
        .find(|listing| listing.moderation.risk_score < 20)
    else {
        println!("  No clean listing available for takeover");
        return;
    };

    let broker = Actor::new("broker-thao", Role::Broker);
    let gateway = Actor::new("payment-gateway", Role::System);

    let request = match desk
        .takeover()
        .request(seller, &target.id, broker.id.clone(), "Chị Lan")
    {
        Ok(request) => request,
        Err(err) => {
            println!("  Request refused: {}", err);
            return;
        }
    };
    println!("  {} asked {} to manage {}", seller.id, broker.id, target.id);

    match desk
        .takeover()
        .respond(&broker, &target.id, &request.id, TakeoverResponse::Accept)
    {
        Ok(listing) => println!(
            "  Accepted; responsible broker is now {}",
            listing
                .responsible_broker_id
                .as_ref()
                .map(|id| id.0.as_str())
                .unwrap_or("-")
        ),
        Err(err) => {
            println!("  Acceptance failed: {}", err);
            return;
        }
    }

    match desk.takeover().confirm_payment(&gateway, &target.id) {
        Ok(payment) => println!(
            "  Takeover fee settled: {} VND ({})",
            payment.amount, payment.id.0
        ),
        Err(err) => println!("  Settlement failed: {}", err),
    }
}

fn print_moderation(listing: &Listing) {
    let moderation = &listing.moderation;
    println!(
        "  {} {:<40} risk {:>3} -> {} / {}",
        listing.id,
        listing.title,
        moderation.risk_score,
        moderation.decision.label(),
        listing.status
    );
    for flag in &moderation.flags {
        println!("      flag: {}", flag);
    }
}
