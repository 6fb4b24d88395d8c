use holdem_engine::cards::Card;
use holdem_engine::deck::Deck;
use holdem_engine::player::Action;
use holdem_engine::table::{GameStage, Table, TableConfig, TableEvent};

fn stacked_deck(literals: &[&str]) -> Deck {
    let cards: Vec<Card> = literals.iter().map(|s| s.parse().unwrap()).collect();
    Deck::from_cards(cards)
}

fn fire_last_timer(table: &mut Table, events: &[TableEvent]) {
    let (kind, generation) = events
        .iter()
        .rev()
        .find_map(|e| match e {
            TableEvent::Schedule {
                kind, generation, ..
            } => Some((*kind, *generation)),
            _ => None,
        })
        .expect("a timer was scheduled");
    table.handle_timer(kind, generation).unwrap();
}

/// Three players go all-in for different amounts; the short stack holds
/// the best hand and takes only the main pot, the covering bets settle
/// through the side pots.
#[test]
fn three_way_all_in_splits_into_main_and_side_pots() {
    let mut table = Table::new("sidepots", TableConfig::default());

    // hand one is a throwaway to skew the stacks: alice open-folds her
    // small blind, leaving alice 995, bob 1005, carol untouched at 1000
    table.preload_deck(stacked_deck(&["2s", "3s", "4s", "5c"]));
    let (alice, _) = table.add_player("alice").unwrap();
    let (bob, _) = table.add_player("bob").unwrap();
    let (carol, _) = table.add_player("carol").unwrap();
    table.apply_player_action(&alice, Action::Fold).unwrap();

    let events = table.drain_events();
    fire_last_timer(&mut table, &events); // payout display -> cleanup
    let events = table.drain_events();

    // hand two: bob deals, carol posts small blind, alice posts big
    // blind; deal order starts left of the button (carol, alice, bob)
    table.preload_deck(stacked_deck(&[
        "Qs", "As", "Ks", "Qd", "Ad", "Kd", // carol QQ, alice AA, bob KK
        "2c", // burn
        "2h", "7c", "9d", // flop
        "5s", // burn
        "3h", // turn
        "6h", // burn
        "4s", // river
    ]));
    fire_last_timer(&mut table, &events); // inter-hand delay -> next deal
    assert_eq!(table.stage(), GameStage::Preflop);

    // bob shoves 1005, carol's 1000 and alice's 995 are calls for less
    table.apply_player_action(&bob, Action::AllIn).unwrap();
    table.apply_player_action(&carol, Action::Call).unwrap();
    table.apply_player_action(&alice, Action::Call).unwrap();

    // everyone is all-in: the board runs out and the hand settles
    assert_eq!(table.stage(), GameStage::Payouts);
    assert_eq!(table.community_cards().len(), 5);

    // the final pot broadcast carries the partition: 2985 main plus the
    // 10 and 5 that only the deeper stacks could win
    let events = table.drain_events();
    let (main_pot, side_pots, total_pot) = events
        .iter()
        .rev()
        .find_map(|e| match e {
            TableEvent::PotUpdate {
                main_pot,
                side_pots,
                total_pot,
            } => Some((*main_pot, side_pots.clone(), *total_pot)),
            _ => None,
        })
        .expect("a pot update was broadcast");
    assert_eq!(main_pot, 2985);
    assert_eq!(side_pots, vec![10, 5]);
    assert_eq!(total_pot, 3000);

    // with the winners credited, the pots are settled into stacks
    assert!(table.pots().is_empty());

    // aces scoop the main pot; kings beat queens for both side pots
    let winners = table.winners().unwrap();
    let paid = |id: &str| {
        winners
            .iter()
            .find(|w| w.player_id == id)
            .map(|w| w.amount)
            .unwrap_or(0)
    };
    assert_eq!(paid(&alice), 2985);
    assert_eq!(paid(&bob), 15);
    assert_eq!(paid(&carol), 0);

    let view = table.full_view();
    let chips = |id: &str| {
        view.seats
            .iter()
            .flatten()
            .find(|s| s.player_id == id)
            .map(|s| s.chips)
            .unwrap_or(0)
    };
    assert_eq!(chips(&alice), 2985);
    assert_eq!(chips(&bob), 15);
    assert_eq!(chips(&carol), 0);

    // carol busted and loses her seat at cleanup
    fire_last_timer(&mut table, &events);
    assert_eq!(table.seated_count(), 2);
    assert!(table.find_player(&carol).is_none());
}

/// A mid-hand leaver's chips stay in the pot but can no longer win it.
#[test]
fn leaver_is_excluded_from_eligibility_but_funds_the_pot() {
    let mut table = Table::with_seed("leaver", TableConfig::default(), 17);
    let (alice, _) = table.add_player("alice").unwrap();
    let (bob, _) = table.add_player("bob").unwrap();

    // alice completes the small blind and immediately leaves
    table.apply_player_action(&alice, Action::Call).unwrap();
    table.remove_player(&alice).unwrap();

    // bob is the last contender: the whole 20 lands in his stack
    assert_eq!(table.stage(), GameStage::Payouts);
    let winners = table.winners().unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].player_id, bob);
    assert_eq!(winners[0].amount, 20);
    assert_eq!(table.find_player(&bob).unwrap().chips, 1010);
}
