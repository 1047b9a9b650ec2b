use super::*;
use log::warn;

impl TrackerEngine {
    pub(super) fn process_queued_commands(&mut self) {
        while let Some(queued) = self.queued_commands.pop_front() {
            debug!(
                "applying command {} (seq {})",
                queued.command.command_id, queued.insertion_sequence
            );
            self.apply_command(queued.command);
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command.payload {
            CommandPayload::AddItem {
                item_id,
                item_name,
                goal_amount,
                category,
            } => self.apply_add_item(item_id, item_name, goal_amount, category),
            CommandPayload::RemoveItem { item_id, category } => {
                let key = ItemKey::new(item_id, category);
                if self.items.remove(&key).is_some() {
                    self.schedule_changed(key);
                } else {
                    debug!("remove ignored, item {key} is not tracked");
                }
            }
            CommandPayload::SetGoal {
                item_id,
                category,
                goal_amount,
            } => {
                let key = ItemKey::new(item_id, category);
                match self.items.get_mut(&key) {
                    Some(item) if item.goal_amount != goal_amount => {
                        item.goal_amount = goal_amount;
                        self.schedule_changed(key);
                    }
                    Some(_) => {}
                    None => warn!("set goal ignored, item {key} is not tracked"),
                }
            }
            CommandPayload::RegisterCategory { name } => {
                if self.category_order.register(&name) {
                    self.scheduler.mark_dirty(self.clock);
                }
            }
            CommandPayload::RemoveCategory { name } => self.apply_remove_category(&name),
            CommandPayload::RenameCategory { old_name, new_name } => {
                self.apply_rename_category(&old_name, &new_name);
            }
            CommandPayload::MoveCategory { name, new_index } => {
                self.category_order.reorder(&name, new_index);
                self.scheduler.mark_dirty(self.clock);
            }
            CommandPayload::ResetAll => {
                let all_keys = self.items.keys().cloned().collect::<BTreeSet<_>>();
                self.items.clear();
                self.category_order.clear();
                self.cache.clear();
                self.scheduler.schedule(all_keys, self.clock);
            }
        }
    }

    fn apply_add_item(
        &mut self,
        item_id: i32,
        item_name: String,
        goal_amount: Option<u64>,
        category: String,
    ) {
        let category = if category.is_empty() {
            self.config.default_category.clone()
        } else {
            category
        };
        let key = ItemKey::new(item_id, category.clone());
        if self.items.contains_key(&key) {
            debug!("add ignored, item {key} is already tracked");
            return;
        }

        let mut item = TrackedItem::new(item_id, item_name, goal_amount, category.clone());
        // Seed from whatever is observed right now; a brand-new item has no
        // prior breakdown to carry forward.
        if let Some((total, breakdown)) = reconcile::reconcile_breakdown(
            &self.registry,
            &self.config,
            &self.cache,
            item_id,
            &item.container_quantities,
        ) {
            item.current_amount = total;
            item.container_quantities = breakdown;
        }

        self.category_order.register(&category);
        self.items.insert(key.clone(), item);
        self.schedule_changed(key);
    }

    fn apply_remove_category(&mut self, name: &str) {
        let removed_keys = self
            .items
            .keys()
            .filter(|key| key.category == name)
            .cloned()
            .collect::<BTreeSet<_>>();
        for key in &removed_keys {
            self.items.remove(key);
        }
        let order_changed = self.category_order.remove(name);

        if !removed_keys.is_empty() {
            self.scheduler.schedule(removed_keys, self.clock);
        } else if order_changed {
            self.scheduler.mark_dirty(self.clock);
        }
    }

    /// Renames the order entry and migrates every item of the category in
    /// one apply, so no observer ever sees a half-renamed state.
    fn apply_rename_category(&mut self, old_name: &str, new_name: &str) {
        if let Err(err) = self.category_order.rename(old_name, new_name) {
            // Validated up front by the API facade; state may still have
            // moved between enqueue and apply.
            warn!("rename ignored: {err}");
            return;
        }

        let old_keys = self
            .items
            .keys()
            .filter(|key| key.category == old_name)
            .cloned()
            .collect::<Vec<_>>();
        let mut changed = BTreeSet::new();
        for old_key in old_keys {
            if let Some(mut item) = self.items.remove(&old_key) {
                item.category = new_name.to_string();
                let new_key = item.key();
                self.items.insert(new_key.clone(), item);
                changed.insert(new_key);
            }
        }
        self.scheduler.schedule(changed, self.clock);
    }

    fn schedule_changed(&mut self, key: ItemKey) {
        let mut changed = BTreeSet::new();
        changed.insert(key);
        self.scheduler.schedule(changed, self.clock);
    }
}
