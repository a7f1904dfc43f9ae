use crate::infra::{seed_demo_world, LogNotifier};
use clap::Args;
use std::sync::Arc;

use prestalink::error::AppError;
use prestalink::identity::StaticDirectory;
use prestalink::marketplace::{
    Bid, Marketplace, MemoryStore, NewRequest, NewReview, PublishedFilter, Urgency,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Locality used for the demo request.
    #[arg(long, default_value = "Plateau")]
    pub(crate) locality: String,
    /// Skip the messaging exchange portion of the demo.
    #[arg(long)]
    pub(crate) skip_messages: bool,
}

/// Walk the full matching workflow on an in-memory marketplace: post, bid,
/// accept with auto-rejection, message, complete, review.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(StaticDirectory::new());
    let world = seed_demo_world(&store, &directory);
    let marketplace = Marketplace::new(store, directory, Arc::new(LogNotifier));

    println!("PrestaLink matching workflow demo");
    println!("---------------------------------");

    let request = marketplace.create_request(
        world.client.id,
        NewRequest {
            category_id: world.plumbing,
            title: "Fix leaking pipe".to_string(),
            description: "Kitchen pipe leaks under the sink, needs urgent repair".to_string(),
            locality: args.locality.clone(),
            address: Some("12 Rue des Jardins".to_string()),
            budget_min: Some(10_000),
            budget_max: Some(20_000),
            desired_date: None,
            urgency: Urgency::Urgent,
        },
        true,
    )?;
    println!(
        "{} published \"{}\" in {} (request #{})",
        world.client.name, request.title, request.locality, request.id.0
    );

    marketplace.create_request(
        world.client.id,
        NewRequest {
            category_id: world.electrical,
            title: "Rewire living room sockets".to_string(),
            description: "Two wall sockets spark when used".to_string(),
            locality: args.locality.clone(),
            address: None,
            budget_min: None,
            budget_max: Some(30_000),
            desired_date: None,
            urgency: Urgency::Normal,
        },
        true,
    )?;
    let open = marketplace.list_published(PublishedFilter::default())?;
    let plumbing_only = marketplace.list_published(PublishedFilter {
        category_id: Some(world.plumbing),
        ..PublishedFilter::default()
    })?;
    println!(
        "{} open requests, {} in Plumbing",
        open.len(),
        plumbing_only.len()
    );

    let winning = marketplace.apply(
        request.id,
        &world.plumber,
        Bid {
            message: Some("Available today".to_string()),
            proposed_price: Some(15_000),
            proposed_days: Some(1),
        },
    )?;
    let losing = marketplace.apply(
        request.id,
        &world.electrician,
        Bid {
            message: Some("Can look at it tomorrow".to_string()),
            proposed_price: Some(18_000),
            proposed_days: Some(2),
        },
    )?;
    println!(
        "{} bid {} FCFA, {} bid {} FCFA",
        world.plumber.name, 15_000, world.electrician.name, 18_000
    );

    let accepted = marketplace.accept(winning.id, world.client.id)?;
    let rejected = marketplace
        .list_by_request(request.id, world.client.id)?
        .into_iter()
        .find(|view| view.id == losing.id);
    println!(
        "{} accepted {}'s bid; sibling bid is now {}",
        world.client.name,
        world.plumber.name,
        rejected
            .map(|view| view.status.label())
            .unwrap_or("missing"),
    );
    println!(
        "provider contact unlocked: {}",
        accepted.provider_phone.as_deref().unwrap_or("(none)")
    );

    if !args.skip_messages {
        marketplace.send_message(
            winning.id,
            world.client.id,
            "Can you come this afternoon?".to_string(),
        )?;
        marketplace.send_message(winning.id, world.plumber.id, "Yes, around 3pm".to_string())?;
        let thread = marketplace.conversation(winning.id, world.client.id)?;
        println!("conversation has {} messages", thread.len());
    }

    marketplace.complete_request(request.id, world.client.id)?;
    marketplace.create_review(
        winning.id,
        world.client.id,
        NewReview {
            rating: 5,
            comment: Some("Fast and clean work".to_string()),
            quality: Some(5),
            punctuality: Some(4),
            communication: None,
        },
    )?;
    let average = marketplace.average_rating(world.plumber.id)?;
    println!(
        "job completed and reviewed; {} now averages {:.1} over {} review(s)",
        world.plumber.name,
        average.unwrap_or_default(),
        marketplace.reviews_by_provider(world.plumber.id)?.len()
    );

    Ok(())
}
